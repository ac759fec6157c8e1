use crate::health_scoring::domain::version;
use crate::health_scoring::domain::Vulnerability;

/// VulnerabilityClassifier - separates open advisories from historical ones
///
/// Advisory feeds are queried without a version, so every advisory ever
/// published for a package comes back. Whether each one still applies is
/// decided here, against the installed version.
pub struct VulnerabilityClassifier;

impl VulnerabilityClassifier {
    /// Marks each advisory as fixed when the installed version is at least
    /// its fixed version.
    ///
    /// Without an installed version, or without a known fix, the advisory
    /// stays open.
    pub fn classify(
        installed_version: Option<&str>,
        vulnerabilities: Vec<Vulnerability>,
    ) -> Vec<Vulnerability> {
        vulnerabilities
            .into_iter()
            .map(|mut vulnerability| {
                vulnerability.fixed_in_installed_version =
                    match (installed_version, vulnerability.fixed_version.as_deref()) {
                        (Some(installed), Some(fixed)) => version::is_at_least(installed, fixed),
                        _ => false,
                    };
                vulnerability
            })
            .collect()
    }
}

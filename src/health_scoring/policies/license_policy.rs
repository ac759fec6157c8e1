use serde::Serialize;

/// How restrictive a license is for downstream users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseCategory {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    /// A license is declared but not one we classify
    Unrecognized,
    Missing,
}

impl LicenseCategory {
    /// Informational license score in 0..=100.
    pub fn score(self) -> f64 {
        match self {
            LicenseCategory::Permissive => 100.0,
            LicenseCategory::WeakCopyleft => 75.0,
            LicenseCategory::StrongCopyleft => 60.0,
            LicenseCategory::Unrecognized => 50.0,
            LicenseCategory::Missing => 30.0,
        }
    }
}

/// LicensePolicy for classifying a package license
///
/// The repository's SPDX identifier is preferred over the registry's
/// free-form license field. Identifiers are matched case-insensitively as
/// substrings, after spaces and underscores are turned into hyphens, so
/// `Apache License 2.0`-style text still needs its SPDX form to match.
///
/// Weak copyleft is checked before strong copyleft because `LGPL-3.0`
/// contains `GPL-3.0`.
pub struct LicensePolicy;

impl LicensePolicy {
    const PERMISSIVE: [&'static str; 7] = [
        "MIT",
        "APACHE-2.0",
        "BSD-2-CLAUSE",
        "BSD-3-CLAUSE",
        "ISC",
        "UNLICENSE",
        "0BSD",
    ];
    const WEAK_COPYLEFT: [&'static str; 3] = ["LGPL-2.1", "LGPL-3.0", "MPL-2.0"];
    const STRONG_COPYLEFT: [&'static str; 3] = ["GPL-2.0", "GPL-3.0", "AGPL-3.0"];

    /// Picks the license to judge: repository first, then registry.
    pub fn select<'a>(repository: Option<&'a str>, registry: Option<&'a str>) -> Option<&'a str> {
        repository
            .filter(|l| !l.trim().is_empty())
            .or_else(|| registry.filter(|l| !l.trim().is_empty()))
    }

    pub fn categorize(license: Option<&str>) -> LicenseCategory {
        let Some(license) = license.filter(|l| !l.trim().is_empty()) else {
            return LicenseCategory::Missing;
        };

        let normalized = license.trim().to_uppercase().replace([' ', '_'], "-");
        let matches = |ids: &[&str]| ids.iter().any(|id| normalized.contains(id));

        if matches(&Self::PERMISSIVE) {
            LicenseCategory::Permissive
        } else if matches(&Self::WEAK_COPYLEFT) {
            LicenseCategory::WeakCopyleft
        } else if matches(&Self::STRONG_COPYLEFT) {
            LicenseCategory::StrongCopyleft
        } else {
            LicenseCategory::Unrecognized
        }
    }
}

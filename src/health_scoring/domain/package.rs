use crate::shared::error::HealthError;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

/// Maximum length for package names (PyPI limit)
const MAX_PACKAGE_NAME_LENGTH: usize = 150;

/// Maximum length for package versions (security limit)
const MAX_VERSION_LENGTH: usize = 100;

static VALID_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z0-9]|[a-z0-9][a-z0-9._-]*[a-z0-9])$").expect("valid name pattern")
});

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid separator pattern"));

/// Validated package name with its PEP 503 normalized form.
///
/// `Flask_SQLAlchemy`, `flask-sqlalchemy` and `Flask.SQLAlchemy` are the same
/// package: equality and hashing use the normalized form only.
#[derive(Debug, Clone)]
pub struct PackageName {
    original: String,
    normalized: String,
}

impl PackageName {
    pub fn new(name: &str) -> Result<Self, HealthError> {
        let name = name.trim();
        let invalid = |reason: String| HealthError::InvalidPackage {
            input: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("package name cannot be empty".to_string()));
        }

        if name.len() > MAX_PACKAGE_NAME_LENGTH {
            return Err(invalid(format!(
                "package name is too long ({} bytes, maximum {})",
                name.len(),
                MAX_PACKAGE_NAME_LENGTH
            )));
        }

        if name.chars().any(|c| c.is_control()) {
            return Err(invalid("package name contains control characters".to_string()));
        }

        if !VALID_NAME.is_match(name) {
            return Err(invalid(
                "package names must start and end with a letter or digit and contain only letters, digits, '.', '_' and '-'"
                    .to_string(),
            ));
        }

        Ok(Self {
            original: name.to_string(),
            normalized: normalize_name(name),
        })
    }

    /// Lowercase name with separator runs collapsed to `-`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Name as the caller spelled it.
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized)
    }
}

/// PEP 503 normalization.
pub fn normalize_name(name: &str) -> String {
    SEPARATOR_RUNS
        .replace_all(name.trim(), "-")
        .to_lowercase()
}

/// A package to assess: name, optional pinned version, optional extras.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageIdentifier {
    name: PackageName,
    version: Option<String>,
    extras: BTreeSet<String>,
}

impl PackageIdentifier {
    pub fn new(name: &str) -> Result<Self, HealthError> {
        Ok(Self {
            name: PackageName::new(name)?,
            version: None,
            extras: BTreeSet::new(),
        })
    }

    pub fn with_version(mut self, version: &str) -> Result<Self, HealthError> {
        self.version = Some(validate_version(self.name.as_str(), version)?);
        Ok(self)
    }

    pub fn with_extras<I, S>(mut self, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extras = extras
            .into_iter()
            .map(|extra| normalize_name(extra.as_ref()))
            .filter(|extra| !extra.is_empty())
            .collect();
        self
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Normalized name, the root of every cache key for this package.
    pub fn normalized_name(&self) -> &str {
        self.name.normalized()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn extras(&self) -> &BTreeSet<String> {
        &self.extras
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        if let Some(version) = &self.version {
            write!(f, "=={}", version)?;
        }
        Ok(())
    }
}

impl FromStr for PackageIdentifier {
    type Err = HealthError;

    /// Parses `name`, `name==version`, `name[extra1,extra2]` or
    /// `name[extra]==version`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let invalid = |reason: &str| HealthError::InvalidPackage {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (requirement, version) = match input.split_once("==") {
            Some((requirement, version)) => (requirement.trim(), Some(version.trim())),
            None => (input, None),
        };

        let (name, extras) = match requirement.split_once('[') {
            Some((name, rest)) => {
                let extras = rest
                    .strip_suffix(']')
                    .ok_or_else(|| invalid("unterminated extras list"))?;
                if extras.contains('[') || extras.contains(']') {
                    return Err(invalid("nested brackets in extras list"));
                }
                let extras: Vec<&str> = extras
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .collect();
                (name.trim(), extras)
            }
            None => (requirement, Vec::new()),
        };

        for extra in &extras {
            if !VALID_NAME.is_match(extra) {
                return Err(invalid("extras must be valid names"));
            }
        }

        let identifier = PackageIdentifier::new(name)
            .map_err(|e| match e {
                HealthError::InvalidPackage { reason, .. } => invalid(&reason),
                other => other,
            })?
            .with_extras(extras);

        match version {
            Some(version) => identifier.with_version(version).map_err(|e| match e {
                HealthError::InvalidPackage { reason, .. } => invalid(&reason),
                other => other,
            }),
            None => Ok(identifier),
        }
    }
}

fn validate_version(name: &str, version: &str) -> Result<String, HealthError> {
    let version = version.trim();
    let invalid = |reason: String| HealthError::InvalidPackage {
        input: format!("{}=={}", name, version),
        reason,
    };

    if version.is_empty() {
        return Err(invalid("version cannot be empty".to_string()));
    }

    if version.len() > MAX_VERSION_LENGTH {
        return Err(invalid(format!(
            "version is too long ({} bytes, maximum {})",
            version.len(),
            MAX_VERSION_LENGTH
        )));
    }

    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '!'))
    {
        return Err(invalid(
            "versions may only contain letters, digits, '.', '-', '_', '+' and '!'".to_string(),
        ));
    }

    Ok(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Flask_SQLAlchemy"), "flask-sqlalchemy");
        assert_eq!(normalize_name("ruamel.yaml"), "ruamel-yaml");
        assert_eq!(normalize_name("a__-._b"), "a-b");
        assert_eq!(normalize_name("Requests"), "requests");
    }

    #[test]
    fn test_package_name_equality_is_case_insensitive() {
        let a = PackageName::new("Django").unwrap();
        let b = PackageName::new("django").unwrap();
        let c = PackageName::new("DJANGO").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "Django");
        assert_eq!(a.normalized(), "django");

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&c));
    }

    #[test]
    fn test_package_name_rejects_invalid_names() {
        assert!(PackageName::new("").is_err());
        assert!(PackageName::new("-leading").is_err());
        assert!(PackageName::new("trailing.").is_err());
        assert!(PackageName::new("bad name").is_err());
        assert!(PackageName::new("pkg/../etc").is_err());
        assert!(PackageName::new(&"a".repeat(151)).is_err());
        assert!(PackageName::new("x").is_ok());
    }

    #[test]
    fn test_parse_name_only() {
        let id: PackageIdentifier = "requests".parse().unwrap();
        assert_eq!(id.normalized_name(), "requests");
        assert_eq!(id.version(), None);
        assert!(id.extras().is_empty());
    }

    #[test]
    fn test_parse_name_version_and_extras() {
        let id: PackageIdentifier = "Requests[socks, security]==2.31.0".parse().unwrap();
        assert_eq!(id.normalized_name(), "requests");
        assert_eq!(id.version(), Some("2.31.0"));
        let extras: Vec<&str> = id.extras().iter().map(String::as_str).collect();
        assert_eq!(extras, vec!["security", "socks"]);
        assert_eq!(id.to_string(), "requests[security,socks]==2.31.0");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!("".parse::<PackageIdentifier>().is_err());
        assert!("requests[socks".parse::<PackageIdentifier>().is_err());
        assert!("requests==".parse::<PackageIdentifier>().is_err());
        assert!("requests==1.0 ; rm -rf".parse::<PackageIdentifier>().is_err());
        assert!("re quests".parse::<PackageIdentifier>().is_err());
    }

    #[test]
    fn test_parse_error_reports_original_input() {
        let err = "bad name==1.0".parse::<PackageIdentifier>().unwrap_err();
        match err {
            HealthError::InvalidPackage { input, .. } => assert_eq!(input, "bad name==1.0"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_identifier_equality_uses_normalized_name() {
        let a: PackageIdentifier = "Flask_Login==0.6.3".parse().unwrap();
        let b: PackageIdentifier = "flask-login==0.6.3".parse().unwrap();
        let c: PackageIdentifier = "flask-login==0.6.2".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_identifier_serializes_normalized_name() {
        let id: PackageIdentifier = "Flask_Login==0.6.3".parse().unwrap();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["name"], "flask-login");
        assert_eq!(json["version"], "0.6.3");
    }
}

use crate::shared::error::HealthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Maps a CVSS base score onto the usual qualitative bands.
    pub fn from_cvss_score(score: CvssScore) -> Self {
        let value = score.value();
        if value >= 9.0 {
            Severity::Critical
        } else if value >= 7.0 {
            Severity::High
        } else if value >= 4.0 {
            Severity::Medium
        } else if value > 0.0 {
            Severity::Low
        } else {
            Severity::Info
        }
    }

    /// Security points removed for one open advisory of this severity.
    pub fn deduction(self) -> f64 {
        match self {
            Severity::Critical => 40.0,
            Severity::High => 25.0,
            Severity::Medium => 10.0,
            Severity::Low => 5.0,
            Severity::Info => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CVSS base score in the range 0.0..=10.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct CvssScore(f32);

impl CvssScore {
    pub fn new(value: f32) -> Result<Self, HealthError> {
        if !(0.0..=10.0).contains(&value) {
            return Err(HealthError::Validation {
                message: format!("CVSS score must be between 0.0 and 10.0, got {}", value),
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for CvssScore {
    type Error = HealthError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        CvssScore::new(value)
    }
}

impl From<CvssScore> for f32 {
    fn from(score: CvssScore) -> Self {
        score.0
    }
}

/// A published advisory affecting some range of a package's versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_versions: String,
    #[serde(default)]
    pub fixed_version: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub cvss_score: Option<CvssScore>,
    /// Set by classification against the installed version only.
    #[serde(default, skip_deserializing)]
    pub fixed_in_installed_version: bool,
}

impl Vulnerability {
    pub fn new(id: impl Into<String>, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity,
            title: title.into(),
            description: String::new(),
            affected_versions: String::new(),
            fixed_version: None,
            published: None,
            references: Vec::new(),
            cvss_score: None,
            fixed_in_installed_version: false,
        }
    }

    pub fn with_fixed_version(mut self, fixed_version: impl Into<String>) -> Self {
        self.fixed_version = Some(fixed_version.into());
        self
    }

    pub fn with_affected_versions(mut self, affected_versions: impl Into<String>) -> Self {
        self.affected_versions = affected_versions.into();
        self
    }

    pub fn with_cvss_score(mut self, score: CvssScore) -> Self {
        self.cvss_score = Some(score);
        self
    }

    pub fn is_open(&self) -> bool {
        !self.fixed_in_installed_version
    }
}

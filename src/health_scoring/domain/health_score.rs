use super::vulnerability::Vulnerability;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Letter grade derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthGrade {
    A,
    B,
    C,
    D,
    F,
}

impl HealthGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            HealthGrade::A
        } else if score >= 75.0 {
            HealthGrade::B
        } else if score >= 65.0 {
            HealthGrade::C
        } else if score >= 55.0 {
            HealthGrade::D
        } else {
            HealthGrade::F
        }
    }

    pub fn is_failing(self) -> bool {
        matches!(self, HealthGrade::D | HealthGrade::F)
    }
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            HealthGrade::A => "A",
            HealthGrade::B => "B",
            HealthGrade::C => "C",
            HealthGrade::D => "D",
            HealthGrade::F => "F",
        };
        f.write_str(letter)
    }
}

/// How much of the input data was actually available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaintenanceStatus {
    Active,
    Stable,
    Slow,
    Minimal,
    Abandoned,
    Deprecated,
    Archived,
}

impl MaintenanceStatus {
    /// Classifies by the most recent sign of life, in days.
    pub fn from_days_inactive(days: Option<i64>) -> Self {
        match days {
            Some(d) if d < 90 => MaintenanceStatus::Active,
            Some(d) if d < 365 => MaintenanceStatus::Stable,
            Some(d) if d < 730 => MaintenanceStatus::Slow,
            Some(d) if d < 1095 => MaintenanceStatus::Minimal,
            _ => MaintenanceStatus::Abandoned,
        }
    }
}

/// Whether the vulnerability feed answered for this package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityDataState {
    Known,
    Unknown,
}

/// Per-dimension scores, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub security: f64,
    pub maintenance: f64,
    pub community: f64,
    pub popularity: f64,
    /// Reported alongside the others but not weighted into the overall score
    pub code_quality: f64,
    /// License permissiveness; informational and unweighted like `code_quality`
    pub license: f64,
}

/// Result of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
    pub overall: f64,
    pub grade: HealthGrade,
    pub components: ComponentScores,
    pub maintenance_status: MaintenanceStatus,
    pub vulnerabilities: Vec<Vulnerability>,
    pub risk_factors: Vec<String>,
    pub positive_factors: Vec<String>,
    pub confidence: ConfidenceLevel,
    pub security_data: SecurityDataState,
    pub calculated_at: DateTime<Utc>,
}

impl HealthScore {
    pub fn open_vulnerabilities(&self) -> impl Iterator<Item = &Vulnerability> {
        self.vulnerabilities.iter().filter(|v| v.is_open())
    }

    pub fn has_open_vulnerabilities(&self) -> bool {
        self.open_vulnerabilities().next().is_some()
    }
}

use super::SourceReport;
use crate::health_scoring::domain::{HealthScore, RegistryMetadata, RepositoryMetrics};
use serde::Serialize;

/// DependencyReport - everything learned about one package
///
/// Consumed by the report layer. Registry and repository data are kept
/// as collected (absent when their source failed); the classified
/// vulnerabilities live in `health`.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    /// Specifier as requested, e.g. `requests[socks]==2.31.0`
    pub package: String,
    /// Normalized name
    pub name: String,
    /// Requested version, else the latest registry version
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub update_available: bool,
    pub health: HealthScore,
    pub registry: Option<RegistryMetadata>,
    pub repository: Option<RepositoryMetrics>,
    pub sources: SourceReport,
}

impl DependencyReport {
    /// Failing grade or an advisory the installed version does not fix.
    pub fn is_concerning(&self) -> bool {
        self.health.grade.is_failing() || self.health.has_open_vulnerabilities()
    }
}

/// One line of a batch scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanEntry {
    Assessed {
        input: String,
        report: Box<DependencyReport>,
    },
    /// The specifier could not be parsed; nothing was fetched
    Rejected { input: String, error: String },
}

impl ScanEntry {
    pub fn input(&self) -> &str {
        match self {
            ScanEntry::Assessed { input, .. } | ScanEntry::Rejected { input, .. } => input,
        }
    }

    pub fn report(&self) -> Option<&DependencyReport> {
        match self {
            ScanEntry::Assessed { report, .. } => Some(report),
            ScanEntry::Rejected { .. } => None,
        }
    }
}

/// ScanResponse - batch result, in input order
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub entries: Vec<ScanEntry>,
}

impl ScanResponse {
    pub fn new(entries: Vec<ScanEntry>) -> Self {
        Self { entries }
    }

    pub fn reports(&self) -> impl Iterator<Item = &DependencyReport> {
        self.entries.iter().filter_map(ScanEntry::report)
    }

    pub fn rejected_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ScanEntry::Rejected { .. }))
            .count()
    }

    pub fn concerning_count(&self) -> usize {
        self.reports().filter(|r| r.is_concerning()).count()
    }
}

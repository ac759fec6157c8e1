use crate::shared::{CollectorError, CollectorResult};
use serde::Serialize;

/// Why a source contributed nothing to an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbsenceReason {
    NotFound,
    RateLimited { retry_after_secs: Option<u64> },
    Network { status: Option<u16>, details: String },
    Timeout,
    /// The registry names no GitHub repository for the package
    NoRepository,
}

impl From<&CollectorError> for AbsenceReason {
    fn from(error: &CollectorError) -> Self {
        match error {
            CollectorError::NotFound { .. } => AbsenceReason::NotFound,
            CollectorError::RateLimited { retry_after, .. } => AbsenceReason::RateLimited {
                retry_after_secs: retry_after.map(|d| d.as_secs()),
            },
            CollectorError::Network {
                status, details, ..
            } => AbsenceReason::Network {
                status: *status,
                details: details.clone(),
            },
            CollectorError::Timeout { .. } => AbsenceReason::Timeout,
        }
    }
}

/// Outcome of one source for one package: data, or an explicit gap.
///
/// A gap is never replaced by default data; scoring and confidence see the
/// difference.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Available(T),
    Absent(AbsenceReason),
}

impl<T> SourceOutcome<T> {
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            SourceOutcome::Available(data) => Some(data),
            SourceOutcome::Absent(_) => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            SourceOutcome::Available(data) => Some(data),
            SourceOutcome::Absent(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourceOutcome<U> {
        match self {
            SourceOutcome::Available(data) => SourceOutcome::Available(f(data)),
            SourceOutcome::Absent(reason) => SourceOutcome::Absent(reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceOutcome::Available(_))
    }

    pub fn status(&self) -> SourceStatus {
        match self {
            SourceOutcome::Available(_) => SourceStatus {
                available: true,
                absence: None,
            },
            SourceOutcome::Absent(reason) => SourceStatus {
                available: false,
                absence: Some(reason.clone()),
            },
        }
    }
}

impl<T> From<CollectorResult<T>> for SourceOutcome<T> {
    fn from(result: CollectorResult<T>) -> Self {
        match result {
            Ok(data) => SourceOutcome::Available(data),
            Err(error) => SourceOutcome::Absent(AbsenceReason::from(&error)),
        }
    }
}

/// Serializable availability of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absence: Option<AbsenceReason>,
}

/// Availability of every source consulted for a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub registry: SourceStatus,
    pub downloads: SourceStatus,
    pub repository: SourceStatus,
    pub vulnerability_feed: SourceStatus,
}

impl SourceReport {
    pub fn all_available(&self) -> bool {
        [
            &self.registry,
            &self.downloads,
            &self.repository,
            &self.vulnerability_feed,
        ]
        .iter()
        .all(|s| s.available)
    }
}

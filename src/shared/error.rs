use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish a concerning dependency
/// from a failure of the tool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - every assessed dependency looks healthy
    Success = 0,
    /// At least one dependency has a failing grade or open vulnerabilities
    UnhealthyDependencies = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (configuration, cache, I/O, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::UnhealthyDependencies => write!(f, "Unhealthy Dependencies (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Application-specific errors for health assessment.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Invalid package specifier: {input}\nReason: {reason}\n\n💡 Hint: Use the form name[extra1,extra2]==version, e.g. requests==2.31.0")]
    InvalidPackage { input: String, reason: String },

    #[error("Invalid configuration: {message}\n\n💡 Hint: {hint}")]
    Configuration { message: String, hint: String },

    /// Validation error for builder patterns
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Security violation: {path}\nReason: {reason}\n\n💡 Hint: {hint}")]
    SecurityError {
        path: PathBuf,
        reason: String,
        hint: String,
    },
}

/// Failure of a cache store operation.
///
/// Callers treat these as cache misses; they never fail an assessment.
#[derive(Debug, Clone, Error)]
#[error("Cache {operation} failed: {details}")]
pub struct CacheError {
    pub operation: &'static str,
    pub details: String,
}

impl CacheError {
    pub fn new(operation: &'static str, details: impl fmt::Display) -> Self {
        Self {
            operation,
            details: details.to_string(),
        }
    }
}

/// Failure of a single source fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectorError {
    /// The source has no record of the identifier. Cacheable.
    #[error("{source_name}: '{identifier}' was not found")]
    NotFound {
        source_name: &'static str,
        identifier: String,
    },

    /// The source refused the request because of its quota.
    #[error("{source_name}: rate limited{}", retry_suffix(.retry_after))]
    RateLimited {
        source_name: &'static str,
        retry_after: Option<Duration>,
    },

    #[error("{source_name}: network error{}: {details}", status_suffix(.status))]
    Network {
        source_name: &'static str,
        status: Option<u16>,
        details: String,
    },

    #[error("{source_name}: request timed out")]
    Timeout { source_name: &'static str },
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {}s)", d.as_secs()))
        .unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl CollectorError {
    pub fn network(source_name: &'static str, details: impl fmt::Display) -> Self {
        CollectorError::Network {
            source_name,
            status: None,
            details: details.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectorError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UnhealthyDependencies.as_i32(), 1);
        assert_eq!(ExitCode::InvalidArguments.as_i32(), 2);
        assert_eq!(ExitCode::ApplicationError.as_i32(), 3);
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(format!("{}", ExitCode::Success), "Success (0)");
        assert_eq!(
            format!("{}", ExitCode::UnhealthyDependencies),
            "Unhealthy Dependencies (1)"
        );
        assert_eq!(
            format!("{}", ExitCode::ApplicationError),
            "Application Error (3)"
        );
    }

    #[test]
    fn test_invalid_package_display() {
        let error = HealthError::InvalidPackage {
            input: "bad name!".to_string(),
            reason: "contains invalid characters".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid package specifier: bad name!"));
        assert!(display.contains("contains invalid characters"));
        assert!(display.contains("💡 Hint:"));
    }

    #[test]
    fn test_configuration_error_display() {
        let error = HealthError::Configuration {
            message: "max_concurrency must be at least 1".to_string(),
            hint: "Set max_concurrency to a positive number".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("max_concurrency must be at least 1"));
        assert!(display.contains("Set max_concurrency to a positive number"));
    }

    #[test]
    fn test_cache_error_display() {
        let error = CacheError::new("read", "database is locked");
        assert_eq!(format!("{}", error), "Cache read failed: database is locked");
    }

    #[test]
    fn test_collector_error_display() {
        let error = CollectorError::RateLimited {
            source_name: "github",
            retry_after: Some(Duration::from_secs(120)),
        };
        assert_eq!(format!("{}", error), "github: rate limited (retry after 120s)");

        let error = CollectorError::Network {
            source_name: "pypi",
            status: Some(503),
            details: "service unavailable".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "pypi: network error (HTTP 503): service unavailable"
        );

        let error = CollectorError::network("osv", "connection reset");
        assert_eq!(format!("{}", error), "osv: network error: connection reset");
    }

    #[test]
    fn test_collector_error_is_not_found() {
        let error = CollectorError::NotFound {
            source_name: "pypi",
            identifier: "nope".to_string(),
        };
        assert!(error.is_not_found());
        assert!(!CollectorError::Timeout { source_name: "pypi" }.is_not_found());
    }
}

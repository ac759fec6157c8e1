use super::error::{CacheError, CollectorError};

/// Type alias for Result with anyhow::Error as the error type.
/// This provides a consistent error handling pattern across the codebase.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Result of a single source fetch.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;

/// Result of a cache store operation.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

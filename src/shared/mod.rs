pub mod error;
pub mod result;
pub mod security;

pub use error::{CacheError, CollectorError, ExitCode, HealthError};
pub use result::{CacheResult, CollectorResult, Result};

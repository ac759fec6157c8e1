/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (cache storage, network sources, console).
pub mod cache_store;
pub mod progress_reporter;
pub mod source_collector;

pub use cache_store::{key_prefix, CacheStats, CacheStore, CachedValue, KeyPattern};
pub use progress_reporter::{ProgressReporter, SilentProgressReporter};
pub use source_collector::{DataSource, SourceCollector};

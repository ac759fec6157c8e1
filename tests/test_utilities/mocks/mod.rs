/// Mock implementations for testing
mod mock_cache_store;
mod mock_progress_reporter;
mod mock_source_collector;

pub use mock_cache_store::FailingCacheStore;
pub use mock_progress_reporter::MockProgressReporter;
pub use mock_source_collector::MockSourceCollector;

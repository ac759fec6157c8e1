use async_trait::async_trait;
use dep_health::ports::outbound::{CacheStats, CacheStore, CachedValue};
use dep_health::shared::{CacheError, CacheResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock CacheStore whose every operation fails, counting attempts
#[derive(Default)]
pub struct FailingCacheStore {
    attempts: AtomicUsize,
}

impl FailingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &'static str) -> CacheResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::new(operation, "database is locked"))
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<CachedValue>> {
        self.fail("read")
    }

    async fn set(&self, _: &str, _: &str, _: Duration, _: Option<&str>) -> CacheResult<()> {
        self.fail("write")
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        self.fail("delete")
    }

    async fn invalidate(&self, _pattern: &str) -> CacheResult<usize> {
        self.fail("invalidate")
    }

    async fn cleanup(&self) -> CacheResult<usize> {
        self.fail("cleanup")
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        self.fail("stats")
    }
}

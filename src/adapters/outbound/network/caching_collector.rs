use crate::ports::outbound::{CacheStore, DataSource, SourceCollector};
use crate::shared::{CollectorError, CollectorResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a cached "does not exist" answer.
pub const DEFAULT_NOT_FOUND_TTL: Duration = Duration::from_secs(15 * 60);

/// Default lifetime of a successful but partial result.
pub const DEFAULT_PARTIAL_TTL: Duration = Duration::from_secs(15 * 60);

/// What gets stored under a collector's cache key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
enum CachedOutcome<T> {
    Found(T),
    NotFound,
}

/// CachingCollector wraps a SourceCollector and adds read-through caching.
///
/// This adapter implements the decorator pattern: successes are stored for
/// the collector's TTL, partial successes and `NotFound` answers for their
/// own shorter TTLs.
/// Rate limiting, network errors and timeouts are never cached.
///
/// The cache is optional and fails open: a broken store is logged and the
/// inner collector is called as if the entry were missing.
pub struct CachingCollector<C: SourceCollector> {
    inner: C,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    not_found_ttl: Duration,
    partial_ttl: Duration,
}

impl<C: SourceCollector> CachingCollector<C> {
    /// Creates a caching collector wrapping the given inner collector
    pub fn new(inner: C, cache: Option<Arc<dyn CacheStore>>) -> Self {
        let ttl = inner.default_ttl();
        Self {
            inner,
            cache,
            ttl,
            not_found_ttl: DEFAULT_NOT_FOUND_TTL,
            partial_ttl: DEFAULT_PARTIAL_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_not_found_ttl(mut self, ttl: Duration) -> Self {
        self.not_found_ttl = ttl;
        self
    }

    pub fn with_partial_ttl(mut self, ttl: Duration) -> Self {
        self.partial_ttl = ttl;
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn read(&self, cache: &dyn CacheStore, key: &str) -> Option<CachedOutcome<C::Output>> {
        let cached = match cache.get(key).await {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                tracing::debug!(key, source = %self.inner.source(), "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, fetching live");
                return None;
            }
        };

        match serde_json::from_str(&cached.value) {
            Ok(outcome) => {
                tracing::debug!(key, source = %self.inner.source(), "cache hit");
                Some(outcome)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "undecodable cache entry, fetching live");
                None
            }
        }
    }

    async fn write<T: Serialize + Sync>(
        &self,
        cache: &dyn CacheStore,
        key: &str,
        outcome: &CachedOutcome<T>,
        ttl: Duration,
    ) {
        let value = match serde_json::to_string(outcome) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = cache.set(key, &value, ttl, None).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl<C: SourceCollector> SourceCollector for CachingCollector<C> {
    type Output = C::Output;

    fn source(&self) -> DataSource {
        self.inner.source()
    }

    fn cache_key(&self, identifier: &str) -> String {
        self.inner.cache_key(identifier)
    }

    fn default_ttl(&self) -> Duration {
        self.ttl
    }

    fn is_partial(&self, output: &C::Output) -> bool {
        self.inner.is_partial(output)
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<C::Output> {
        let Some(cache) = self.cache.as_deref() else {
            return self.inner.fetch(identifier).await;
        };

        let key = self.inner.cache_key(identifier);

        match self.read(cache, &key).await {
            Some(CachedOutcome::Found(value)) => return Ok(value),
            Some(CachedOutcome::NotFound) => {
                return Err(CollectorError::NotFound {
                    source_name: self.inner.source().as_str(),
                    identifier: identifier.to_string(),
                })
            }
            None => {}
        }

        match self.inner.fetch(identifier).await {
            Ok(value) => {
                let ttl = if self.inner.is_partial(&value) {
                    tracing::debug!(key = %key, source = %self.inner.source(), "partial result, caching briefly");
                    self.partial_ttl.min(self.ttl)
                } else {
                    self.ttl
                };
                self.write(cache, &key, &CachedOutcome::Found(&value), ttl)
                    .await;
                Ok(value)
            }
            Err(error) if error.is_not_found() => {
                self.write(
                    cache,
                    &key,
                    &CachedOutcome::<&C::Output>::NotFound,
                    self.not_found_ttl,
                )
                .await;
                Err(error)
            }
            Err(error) => Err(error),
        }
    }
}

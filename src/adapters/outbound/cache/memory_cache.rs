use crate::ports::outbound::{key_prefix, CacheStats, CacheStore, CachedValue, KeyPattern};
use crate::shared::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

struct Entry {
    value: CachedValue,
    /// `None` when the TTL overflows `Instant`; such entries never expire.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// InMemoryCacheStore adapter backed by a concurrent hash map
///
/// Used when the persistent cache is disabled, so one run still shares
/// results between pipelines, and in tests. Expired entries are dropped
/// lazily on read or by [`CacheStore::cleanup`].
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_where(&self, mut predicate: impl FnMut(&str, &Entry) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if predicate(key, entry) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let now = Instant::now();
        // The read guard must be dropped before removing the entry.
        let lookup = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        validator: Option<&str>,
    ) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: CachedValue {
                    value: value.to_string(),
                    validator: validator.map(str::to_string),
                },
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn invalidate(&self, pattern: &str) -> CacheResult<usize> {
        let pattern = KeyPattern::parse(pattern)?;
        Ok(self.remove_where(|key, _| pattern.matches(key)))
    }

    async fn cleanup(&self) -> CacheResult<usize> {
        let now = Instant::now();
        Ok(self.remove_where(|_, entry| !entry.is_live(now)))
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let now = Instant::now();
        let mut stats = CacheStats::default();
        let mut entries_by_prefix = BTreeMap::new();

        for item in self.entries.iter() {
            stats.total_entries += 1;
            if item.value().is_live(now) {
                stats.valid_entries += 1;
                *entries_by_prefix
                    .entry(key_prefix(item.key()).to_string())
                    .or_insert(0) += 1;
            }
        }

        stats.expired_entries = stats.total_entries - stats.valid_entries;
        stats.entries_by_prefix = entries_by_prefix;
        Ok(stats)
    }
}

use crate::shared::{CacheError, CacheResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// A live cache entry as returned by [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedValue {
    pub value: String,
    /// Opaque revalidation token (e.g. an ETag) stored alongside the value
    pub validator: Option<String>,
}

/// Snapshot of cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Live entries grouped by the key segment before the first `:`
    pub entries_by_prefix: BTreeMap<String, usize>,
    pub location: Option<String>,
    pub size_bytes: Option<u64>,
}

/// CacheStore port for the local TTL cache shared by all collectors
///
/// Keys follow `source:type:identifier[:qualifier]`. Expiry is absolute:
/// it is fixed when the entry is written and reads never extend it.
///
/// Implementations must be `Send + Sync`; concurrent `set` calls on the same
/// key are upserts where the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the entry if present and not yet expired.
    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>>;

    /// Inserts or replaces an entry expiring `ttl` from now.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        validator: Option<&str>,
    ) -> CacheResult<()>;

    /// Removes one entry. Returns whether it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Removes every entry matching `pattern` (see [`KeyPattern`]).
    /// Returns the number of entries removed.
    async fn invalidate(&self, pattern: &str) -> CacheResult<usize>;

    /// Removes expired entries. Returns the number removed.
    async fn cleanup(&self) -> CacheResult<usize>;

    async fn stats(&self) -> CacheResult<CacheStats>;

    /// Removes everything.
    async fn clear(&self) -> CacheResult<usize> {
        self.invalidate("*").await
    }
}

/// Key pattern for invalidation.
///
/// `*` matches any run of characters. A pattern without `*` is a prefix, so
/// `github:` and `github:*` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    parts: Vec<String>,
    anchored_start: bool,
    anchored_end: bool,
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> CacheResult<Self> {
        if pattern.is_empty() {
            return Err(CacheError::new(
                "invalidate",
                "empty pattern; use '*' to match every key",
            ));
        }

        let pattern = if pattern.contains('*') {
            pattern.to_string()
        } else {
            format!("{}*", pattern)
        };

        Ok(Self {
            parts: pattern.split('*').map(str::to_string).collect(),
            anchored_start: !pattern.starts_with('*'),
            anchored_end: !pattern.ends_with('*'),
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        let last = self.parts.len() - 1;
        let mut rest = key;

        for (i, part) in self.parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if i == 0 && self.anchored_start {
                match rest.strip_prefix(part.as_str()) {
                    Some(remaining) => rest = remaining,
                    None => return false,
                }
            } else if i == last && self.anchored_end {
                return rest.ends_with(part.as_str());
            } else {
                match rest.find(part.as_str()) {
                    Some(pos) => rest = &rest[pos + part.len()..],
                    None => return false,
                }
            }
        }

        true
    }

    /// SQLite `GLOB` expression with the same meaning (case-sensitive).
    pub fn to_sql_glob(&self) -> String {
        self.parts
            .iter()
            .map(|part| {
                part.chars()
                    .map(|c| match c {
                        '?' => "[?]".to_string(),
                        '[' => "[[]".to_string(),
                        other => other.to_string(),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("*")
    }
}

/// First `:`-separated key segment, used to group statistics.
pub fn key_prefix(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

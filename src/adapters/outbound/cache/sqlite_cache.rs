use crate::ports::outbound::{key_prefix, CacheStats, CacheStore, CachedValue, KeyPattern};
use crate::shared::security::validate_not_symlink;
use crate::shared::{CacheError, CacheResult, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    validator TEXT,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at);
"#;

/// SqliteCacheStore adapter persisting cache entries in a local SQLite file
///
/// Timestamps are stored as milliseconds since the Unix epoch. The single
/// connection sits behind a mutex and every statement runs on tokio's
/// blocking pool, so the store can be shared freely between tasks.
///
/// The store is opened explicitly and may be closed explicitly; operations
/// on a closed store fail with a [`CacheError`].
pub struct SqliteCacheStore {
    connection: Arc<Mutex<Option<Connection>>>,
    location: Option<PathBuf>,
}

impl SqliteCacheStore {
    /// Opens (creating if needed) the cache database at `path`.
    ///
    /// # Errors
    /// Returns an error if the path is a symbolic link, the parent directory
    /// cannot be created, or the database cannot be initialized
    pub fn open(path: &Path) -> Result<Self> {
        validate_not_symlink(path, "cache open")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL for cache database")?;

        Self::initialize(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory cache")?;
        Self::initialize(conn, None)
    }

    fn initialize(conn: Connection, location: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout for cache database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize cache schema")?;

        tracing::debug!(location = ?location, "cache store opened");
        Ok(Self {
            connection: Arc::new(Mutex::new(Some(conn))),
            location,
        })
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Closes the underlying connection. Later operations fail.
    pub async fn close(&self) -> CacheResult<()> {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| CacheError::new("close", "connection mutex poisoned"))?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| CacheError::new("close", e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| CacheError::new("close", e))?
    }

    async fn with_connection<T, F>(&self, operation: &'static str, f: F) -> CacheResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| CacheError::new(operation, "connection mutex poisoned"))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| CacheError::new(operation, "cache store is closed"))?;
            f(conn).map_err(|e| CacheError::new(operation, e))
        })
        .await
        .map_err(|e| CacheError::new(operation, e))?
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let key = key.to_string();
        let now = now_millis();
        self.with_connection("read", move |conn| {
            conn.query_row(
                "SELECT value, validator FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| {
                    Ok(CachedValue {
                        value: row.get(0)?,
                        validator: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        validator: Option<&str>,
    ) -> CacheResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        let validator = validator.map(str::to_string);
        let created_at = now_millis();
        let expires_at = created_at.saturating_add(ttl_millis(ttl));

        self.with_connection("write", move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value, validator, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     validator = excluded.validator,
                     created_at = excluded.created_at,
                     expires_at = excluded.expires_at",
                params![key, value, validator, created_at, expires_at],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.with_connection("delete", move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map(|removed| removed > 0)
        })
        .await
    }

    async fn invalidate(&self, pattern: &str) -> CacheResult<usize> {
        let glob = KeyPattern::parse(pattern)?.to_sql_glob();
        self.with_connection("invalidate", move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key GLOB ?1", params![glob])
        })
        .await
    }

    async fn cleanup(&self) -> CacheResult<usize> {
        let now = now_millis();
        self.with_connection("cleanup", move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])
        })
        .await
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let now = now_millis();
        let (total, live_keys) = self
            .with_connection("stats", move |conn| {
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                let mut statement =
                    conn.prepare("SELECT key FROM cache_entries WHERE expires_at > ?1")?;
                let keys = statement
                    .query_map(params![now], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok((total, keys))
            })
            .await?;

        let mut entries_by_prefix = BTreeMap::new();
        for key in &live_keys {
            *entries_by_prefix
                .entry(key_prefix(key).to_string())
                .or_insert(0) += 1;
        }

        let total_entries = usize::try_from(total).unwrap_or_default();
        let valid_entries = live_keys.len();

        Ok(CacheStats {
            total_entries,
            valid_entries,
            expired_entries: total_entries.saturating_sub(valid_entries),
            entries_by_prefix,
            location: self.location.as_ref().map(|p| p.display().to_string()),
            size_bytes: self
                .location
                .as_ref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map(|m| m.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store
            .set("pypi:pkg:requests", "{\"v\":1}", Duration::from_secs(5), Some("etag-1"))
            .await
            .unwrap();

        let cached = store.get("pypi:pkg:requests").await.unwrap().unwrap();
        assert_eq!(cached.value, "{\"v\":1}");
        assert_eq!(cached.validator.as_deref(), Some("etag-1"));
    }

    #[tokio::test]
    async fn test_missing_key_is_a_miss() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_until_cleanup() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store
            .set("github:repo:a/b", "x", Duration::from_millis(30), None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(store.get("github:repo:a/b").await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 1);

        assert_eq!(store.cleanup().await.unwrap(), 1);
        assert_eq!(store.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_set_is_an_upsert() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("k", "first", Duration::from_secs(60), None).await.unwrap();
        store.set("k", "second", Duration::from_secs(60), None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().unwrap().value, "second");
        assert_eq!(store.stats().await.unwrap().total_entries, 1);
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let ttl = Duration::from_secs(60);
        store.set("github:repo:psf/requests", "1", ttl, None).await.unwrap();
        store.set("github:repo:pallets/flask", "2", ttl, None).await.unwrap();
        store.set("pypi:pkg:requests", "3", ttl, None).await.unwrap();

        assert_eq!(store.invalidate("github:*").await.unwrap(), 2);
        assert!(store.get("github:repo:psf/requests").await.unwrap().is_none());
        assert!(store.get("pypi:pkg:requests").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_is_case_sensitive_and_literal() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let ttl = Duration::from_secs(60);
        store.set("GitHub:repo:x", "1", ttl, None).await.unwrap();
        store.set("pypi:pkg:a_b", "2", ttl, None).await.unwrap();
        store.set("pypi:pkg:axb", "3", ttl, None).await.unwrap();

        assert_eq!(store.invalidate("github:").await.unwrap(), 0);
        assert_eq!(store.invalidate("pypi:pkg:a_b").await.unwrap(), 1);
        assert!(store.get("pypi:pkg:axb").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let ttl = Duration::from_secs(60);
        store.set("a:1", "1", ttl, None).await.unwrap();
        store.set("b:1", "2", ttl, None).await.unwrap();

        assert!(store.delete("a:1").await.unwrap());
        assert!(!store.delete("a:1").await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.stats().await.unwrap().total_entries, 0);
    }

    #[tokio::test]
    async fn test_stats_group_live_entries_by_prefix() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let ttl = Duration::from_secs(60);
        store.set("pypi:pkg:a", "1", ttl, None).await.unwrap();
        store.set("pypi:pkg:b", "1", ttl, None).await.unwrap();
        store.set("github:repo:a/b", "1", ttl, None).await.unwrap();
        store.set("vuln:feed:a", "1", Duration::ZERO, None).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.valid_entries, 3);
        assert_eq!(stats.entries_by_prefix.get("pypi"), Some(&2));
        assert_eq!(stats.entries_by_prefix.get("github"), Some(&1));
        assert_eq!(stats.entries_by_prefix.get("vuln"), None);
        assert!(stats.location.is_none());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        let store = SqliteCacheStore::open(&path).unwrap();
        store
            .set("pypi:pkg:flask", "cached", Duration::from_secs(60), None)
            .await
            .unwrap();
        store.close().await.unwrap();
        assert!(store.get("pypi:pkg:flask").await.is_err());

        let reopened = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("pypi:pkg:flask").await.unwrap().unwrap().value,
            "cached"
        );
        let stats = reopened.stats().await.unwrap();
        assert_eq!(stats.location, Some(path.display().to_string()));
        assert!(stats.size_bytes.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_same_key() {
        let store = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set("shared", &i.to_string(), Duration::from_secs(60), None)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(store.get("shared").await.unwrap().is_some());
        assert_eq!(store.stats().await.unwrap().total_entries, 1);
    }
}

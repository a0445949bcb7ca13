//! SQLite implementation of the ChangeCache trait.
//!
//! The persistent backend. Uses rusqlite with bundled SQLite; every call is
//! moved onto tokio's blocking pool so cache lookups never stall the
//! workers that share the runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CacheError, Result};
use crate::migration;
use crate::traits::{CacheEntry, ChangeCache};

/// SQLite-based cache implementation.
///
/// Thread-safe via an internal Mutex around a single connection.
#[derive(Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| CacheError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ChangeCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        let entries = entries.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                )?;
                let now = now_millis();
                for entry in &entries {
                    stmt.execute(params![entry.key, entry.value, now])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM cache_entries ORDER BY key")?;
            let rows = stmt.query_map([], |row| {
                Ok(CacheEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CacheExt;
    use bucketsync_core::FileDigest;

    #[tokio::test]
    async fn test_sqlite_cache_basic() {
        let cache = SqliteCache::open_memory().unwrap();

        cache.put("digest:a", "1").await.unwrap();
        cache.put("digest:a", "2").await.unwrap();
        cache.put("digest:b", "3").await.unwrap();

        assert_eq!(cache.get("digest:a").await.unwrap(), Some("2".into()));
        assert_eq!(cache.get("digest:missing").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 2);
        assert_eq!(
            cache.entries().await.unwrap(),
            vec![CacheEntry::new("digest:a", "2"), CacheEntry::new("digest:b", "3")]
        );
    }

    #[tokio::test]
    async fn test_sqlite_cache_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let digest = FileDigest::from_bytes([0x77; 32]);

        {
            let cache = SqliteCache::open(&path).unwrap();
            cache.store_digest("/site/index.html", &digest).await.unwrap();
        }

        let cache = SqliteCache::open(&path).unwrap();
        assert_eq!(
            cache.lookup_digest("/site/index.html").await.unwrap(),
            Some(digest)
        );
    }

    #[tokio::test]
    async fn test_sqlite_put_many() {
        let cache = SqliteCache::open_memory().unwrap();
        let entries: Vec<CacheEntry> = (0..50)
            .map(|i| CacheEntry::new(format!("digest:{i:03}"), format!("{i}")))
            .collect();

        cache.put_many(&entries).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 50);
        assert_eq!(cache.entries().await.unwrap(), entries);
    }
}

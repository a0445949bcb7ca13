//! ChangeCache trait: the abstract interface for digest persistence.
//!
//! The engine only needs point reads and writes. Each task owns a distinct
//! key, so backends never see cross-key transactions from the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bucketsync_core::FileDigest;

use crate::error::Result;

/// Prefix applied to every cache key written by the engine.
pub const DIGEST_KEY_PREFIX: &str = "digest:";

/// Build the stored key for a task's cache key.
pub fn digest_key(cache_key: &str) -> String {
    format!("{}{}", DIGEST_KEY_PREFIX, cache_key)
}

/// A single cache record, as stored and as shipped in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The ChangeCache trait: async key-value interface.
///
/// All methods are async so that SQLite can run on the blocking pool and a
/// remote key-value service could be plugged in without changing callers.
///
/// # Design Notes
///
/// - **Concurrent point access**: implementations must allow concurrent
///   `get`/`put` on distinct keys from many workers.
/// - **No deletes**: the engine never removes entries; staleness is tolerated.
/// - **Ordered dumps**: `entries` returns records sorted by key so snapshots
///   are byte-stable.
#[async_trait]
pub trait ChangeCache: Send + Sync {
    /// Get the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Insert or overwrite many values at once.
    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        for entry in entries {
            self.put(&entry.key, &entry.value).await?;
        }
        Ok(())
    }

    /// All entries, sorted by key.
    async fn entries(&self) -> Result<Vec<CacheEntry>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Whether the cache holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Digest-typed access on top of [`ChangeCache`].
pub trait CacheExt: ChangeCache {
    /// Look up the last-known digest for a task's cache key.
    ///
    /// Stored values that do not parse as a digest are treated as a miss.
    fn lookup_digest(
        &self,
        cache_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<FileDigest>>> + Send;

    /// Record the digest a task's file had when it was confirmed remotely.
    fn store_digest(
        &self,
        cache_key: &str,
        digest: &FileDigest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<C: ChangeCache + ?Sized> CacheExt for C {
    async fn lookup_digest(&self, cache_key: &str) -> Result<Option<FileDigest>> {
        let key = digest_key(cache_key);
        let Some(stored) = self.get(&key).await? else {
            return Ok(None);
        };

        match FileDigest::from_hex(&stored) {
            Ok(digest) => Ok(Some(digest)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "ignoring unparseable cached digest");
                Ok(None)
            }
        }
    }

    async fn store_digest(&self, cache_key: &str, digest: &FileDigest) -> Result<()> {
        self.put(&digest_key(cache_key), &digest.to_hex()).await
    }
}

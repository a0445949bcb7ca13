//! In-memory implementation of the ChangeCache trait.
//!
//! Same semantics as SQLite but nothing survives the process. Useful for
//! tests, and for runs that load a snapshot from the bucket, sync, and push
//! the snapshot back.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CacheError, Result};
use crate::traits::{CacheEntry, ChangeCache};

/// In-memory cache implementation.
///
/// Thread-safe via RwLock. Keys are kept ordered so dumps are stable.
#[derive(Default)]
pub struct MemoryCache {
    inner: RwLock<BTreeMap<String, String>>,
}

impl MemoryCache {
    /// Create a new empty in-memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with entries.
    pub fn from_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.key, e.value)).collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> CacheError {
    CacheError::LockPoisoned(e.to_string())
}

#[async_trait]
impl ChangeCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        for entry in entries {
            inner.insert(entry.key.clone(), entry.value.clone());
        }
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .iter()
            .map(|(k, v)| CacheEntry::new(k.clone(), v.clone()))
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty().await.unwrap());

        cache.put("digest:b", "2").await.unwrap();
        cache.put("digest:a", "1").await.unwrap();
        cache.put("digest:a", "3").await.unwrap();

        assert_eq!(cache.get("digest:a").await.unwrap(), Some("3".into()));
        assert_eq!(cache.get("digest:z").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 2);

        let entries = cache.entries().await.unwrap();
        assert_eq!(
            entries,
            vec![CacheEntry::new("digest:a", "3"), CacheEntry::new("digest:b", "2")]
        );
    }

    #[tokio::test]
    async fn test_memory_cache_concurrent_distinct_keys() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("digest:file-{i}");
                cache.put(&key, &i.to_string()).await.unwrap();
                cache.get(&key).await.unwrap()
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i.to_string()));
        }
        assert_eq!(cache.len().await.unwrap(), 32);
    }

    #[tokio::test]
    async fn test_from_entries() {
        let cache = MemoryCache::from_entries(vec![CacheEntry::new("k", "v")]);
        assert_eq!(cache.get("k").await.unwrap(), Some("v".into()));
    }
}

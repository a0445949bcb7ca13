//! Remote and cache doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bucketsync_cache::{CacheEntry, CacheError, ChangeCache};
use bucketsync_engine::{ObjectMetadata, ObjectStore, PutObjectRequest, RemoteError};
use bytes::Bytes;

/// Wraps a store, adds latency to HEAD and PUT, and records the peak
/// number of requests in flight.
pub struct GaugeStore {
    inner: Arc<dyn ObjectStore>,
    latency: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeStore {
    pub fn new(inner: Arc<dyn ObjectStore>, latency: Duration) -> Self {
        Self {
            inner,
            latency,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Highest number of concurrent HEAD/PUT requests seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn gauged<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        let out = fut.await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[async_trait]
impl ObjectStore for GaugeStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError> {
        self.gauged(self.inner.head_object(bucket, key)).await
    }

    async fn put_object(&self, request: &PutObjectRequest) -> Result<(), RemoteError> {
        self.gauged(self.inner.put_object(request)).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError> {
        self.inner.get_object(bucket, key).await
    }

    async fn put_bytes(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError> {
        self.inner.put_bytes(bucket, key, body).await
    }
}

/// A cache whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrokenCache;

fn broken() -> CacheError {
    CacheError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "cache backend unavailable",
    ))
}

#[async_trait]
impl ChangeCache for BrokenCache {
    async fn get(&self, _key: &str) -> bucketsync_cache::Result<Option<String>> {
        Err(broken())
    }

    async fn put(&self, _key: &str, _value: &str) -> bucketsync_cache::Result<()> {
        Err(broken())
    }

    async fn entries(&self) -> bucketsync_cache::Result<Vec<CacheEntry>> {
        Err(broken())
    }

    async fn len(&self) -> bucketsync_cache::Result<usize> {
        Err(broken())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketsync_engine::MemoryBucket;

    #[tokio::test]
    async fn test_gauge_store_passes_through() {
        let inner = Arc::new(MemoryBucket::new());
        let gauge = GaugeStore::new(inner.clone(), Duration::from_millis(1));

        gauge.put_bytes("b", "k", Bytes::from_static(b"v")).await.unwrap();
        let head = gauge.head_object("b", "k").await.unwrap();
        assert_eq!(head.size, 1);
        assert_eq!(gauge.peak(), 1);
    }

    #[tokio::test]
    async fn test_broken_cache_fails() {
        assert!(BrokenCache.get("k").await.is_err());
        assert!(BrokenCache.put("k", "v").await.is_err());
    }
}

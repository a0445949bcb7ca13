//! The Publisher: sync a source tree, then invalidate the CDN.
//!
//! The Publisher brings together the sync engine, the optional change cache
//! and the invalidation coordinator. An invalidation is only ever requested
//! after every task of the run succeeded.

use std::sync::Arc;

use bucketsync_cache::{decode_snapshot, encode_snapshot, ChangeCache};
use bucketsync_core::SyncTask;
use bucketsync_engine::{
    CdnClient, InvalidationCoordinator, InvalidationOutcome, ObjectStore, SyncConfig, SyncEngine,
    SyncObserver, SyncReport,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::{PublishError, Result};

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub sync: SyncReport,
    /// The completed invalidation, when a distribution is configured.
    pub invalidation: Option<InvalidationOutcome>,
}

/// Publishes a set of files to a bucket and invalidates its distribution.
pub struct Publisher {
    engine: SyncEngine,
    cdn: Option<Arc<dyn CdnClient>>,
}

impl Publisher {
    /// Create a publisher. Fails if the configuration is invalid.
    pub fn new(config: SyncConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        Ok(Self {
            engine: SyncEngine::new(config, store)?,
            cdn: None,
        })
    }

    /// CDN client used for invalidation.
    pub fn with_cdn(mut self, cdn: Arc<dyn CdnClient>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ChangeCache>) -> Self {
        self.engine = self.engine.with_cache(cache);
        self
    }

    /// Replace the task-to-cache-key mapping (default: source path).
    pub fn with_cache_key<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&SyncTask) -> String + Send + Sync + 'static,
    {
        self.engine = self.engine.with_cache_key(key_fn);
        self
    }

    /// Observer for task outcomes, upload retries and invalidation progress.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.engine = self.engine.with_observer(observer);
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn config(&self) -> &SyncConfig {
        self.engine.config()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    /// Sync every task, then invalidate if a distribution is configured.
    pub async fn publish<I>(&self, tasks: I) -> Result<PublishReport>
    where
        I: IntoIterator<Item = SyncTask>,
    {
        self.check_cdn()?;
        let sync = self.engine.run(tasks).await?;
        self.finish(sync).await
    }

    /// Same as [`publish`](Self::publish) for tasks arriving on a channel.
    pub async fn publish_channel(&self, tasks: mpsc::Receiver<SyncTask>) -> Result<PublishReport> {
        self.check_cdn()?;
        let sync = self.engine.run_channel(tasks).await?;
        self.finish(sync).await
    }

    fn check_cdn(&self) -> Result<()> {
        match (&self.config().distribution_id, &self.cdn) {
            (Some(distribution_id), None) => Err(PublishError::NoCdnClient(distribution_id.clone())),
            _ => Ok(()),
        }
    }

    async fn finish(&self, sync: SyncReport) -> Result<PublishReport> {
        let invalidation = match (&self.config().distribution_id, &self.cdn) {
            (Some(distribution_id), Some(cdn)) => {
                let coordinator =
                    InvalidationCoordinator::new(Arc::clone(cdn), self.config().invalidation.clone())
                        .with_observer(Arc::clone(self.engine.observer()));
                Some(coordinator.invalidate(distribution_id).await?)
            }
            _ => None,
        };

        info!(
            bucket = %self.config().bucket,
            uploaded = sync.uploaded,
            skipped = sync.skipped(),
            invalidated = invalidation.is_some(),
            "publish complete"
        );
        Ok(PublishReport { sync, invalidation })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache snapshot
    // ─────────────────────────────────────────────────────────────────────────

    fn require_cache(&self) -> Result<&Arc<dyn ChangeCache>> {
        self.engine.cache().ok_or(PublishError::NoCache)
    }

    /// Load the cache snapshot stored in the bucket into the attached cache.
    ///
    /// A missing snapshot is not an error. Returns the number of entries loaded.
    pub async fn pull_cache(&self) -> Result<usize> {
        let cache = self.require_cache()?;
        let config = self.config();
        let key = &config.cache_object_key;

        let body = match self.engine.store().get_object(&config.bucket, key).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                info!(key = %key, "no cache snapshot in bucket");
                return Ok(0);
            }
            Err(source) => {
                return Err(PublishError::Snapshot {
                    key: key.clone(),
                    source,
                })
            }
        };

        let entries = decode_snapshot(&body)?;
        cache.put_many(&entries).await?;
        info!(key = %key, entries = entries.len(), "cache snapshot loaded");
        Ok(entries.len())
    }

    /// Write every cache entry to the snapshot object in the bucket.
    ///
    /// Returns the number of entries written.
    pub async fn push_cache(&self) -> Result<usize> {
        let cache = self.require_cache()?;
        let config = self.config();
        let key = &config.cache_object_key;

        let entries = cache.entries().await?;
        let body = encode_snapshot(&entries)?;
        self.engine
            .store()
            .put_bytes(&config.bucket, key, Bytes::from(body))
            .await
            .map_err(|source| PublishError::Snapshot {
                key: key.clone(),
                source,
            })?;

        info!(key = %key, entries = entries.len(), "cache snapshot stored");
        Ok(entries.len())
    }
}

//! The per-task pipeline: digest, cache lookup, probe, upload.

use std::fmt;
use std::sync::Arc;

use bucketsync_cache::{CacheExt, ChangeCache};
use bucketsync_core::{digest_file, Endpoint, FileDigest, SyncOutcome, SyncTask};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::observer::{NoopObserver, SyncObserver};
use crate::probe::{decide, probe, ProbeDecision};
use crate::remote::ObjectStore;
use crate::upload::Uploader;

/// Maps a task to the key its digest is cached under.
pub type CacheKeyFn = Arc<dyn Fn(&SyncTask) -> String + Send + Sync>;

/// Default cache key: the task's source path.
pub fn source_path_key(task: &SyncTask) -> String {
    task.source_path().to_string_lossy().into_owned()
}

/// The sync engine.
///
/// Cheap to clone; every clone shares the same store, cache and observer.
/// Holds no state between runs apart from what the cache holds.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) config: Arc<SyncConfig>,
    endpoint: Endpoint,
    store: Arc<dyn ObjectStore>,
    cache: Option<Arc<dyn ChangeCache>>,
    cache_key: CacheKeyFn,
    observer: Arc<dyn SyncObserver>,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine. The configuration is validated here, once.
    pub fn new(config: SyncConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            endpoint: config.endpoint(),
            config: Arc::new(config),
            store,
            cache: None,
            cache_key: Arc::new(source_path_key),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Consult and update a change cache.
    pub fn with_cache(mut self, cache: Arc<dyn ChangeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the task-to-cache-key mapping.
    pub fn with_cache_key<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&SyncTask) -> String + Send + Sync + 'static,
    {
        self.cache_key = Arc::new(key_fn);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn cache(&self) -> Option<&Arc<dyn ChangeCache>> {
        self.cache.as_ref()
    }

    pub fn observer(&self) -> &Arc<dyn SyncObserver> {
        &self.observer
    }

    /// Object key a task is written to.
    pub fn object_key(&self, task: &SyncTask) -> String {
        task.object_key(&self.config.prefix)
    }

    /// Destination URL a task's digest is bound to.
    pub fn destination_url(&self, task: &SyncTask) -> String {
        self.endpoint
            .object_url(&self.config.bucket, &self.object_key(task))
    }

    /// Compute a task's digest on the blocking pool.
    pub async fn digest(&self, task: &SyncTask) -> Result<FileDigest> {
        let path = task.source_path().to_path_buf();
        let headers = self.config.headers.clone();
        let url = self.destination_url(task);

        let digest = tokio::task::spawn_blocking(move || digest_file(&path, &headers, &url))
            .await
            .map_err(|e| SyncError::TaskPanicked(e.to_string()))??;
        Ok(digest)
    }

    /// Run one task through the pipeline.
    pub async fn sync_task(&self, task: &SyncTask) -> Result<SyncOutcome> {
        let key = self.object_key(task);
        let digest = self.digest(task).await?;

        let cache_key = (self.cache_key)(task);
        if let Some(cache) = self.cache.as_deref() {
            if cache.lookup_digest(&cache_key).await? == Some(digest) {
                debug!(key = %key, digest = %digest, "unchanged since last sync (cache)");
                return Ok(self.finish(&key, SyncOutcome::SkippedCached));
            }
        }

        let remote = probe(self.store.as_ref(), &self.config.bucket, &key).await?;
        let decision = decide(&remote, &digest, self.config.force);

        let outcome = match decision {
            ProbeDecision::Matches => {
                debug!(key = %key, digest = %digest, "unchanged since last sync (remote)");
                SyncOutcome::SkippedRemoteMatch
            }
            ProbeDecision::Upload(reason) => {
                let attempts = Uploader::new(self.store.as_ref(), &self.config, self.observer.as_ref())
                    .upload(task, &key, &digest)
                    .await?;
                debug!(key = %key, digest = %digest, ?reason, attempts, "uploaded");
                SyncOutcome::Uploaded
            }
        };

        if let Some(cache) = self.cache.as_deref() {
            cache.store_digest(&cache_key, &digest).await?;
        }

        Ok(self.finish(&key, outcome))
    }

    fn finish(&self, key: &str, outcome: SyncOutcome) -> SyncOutcome {
        self.observer.on_task_complete(key, outcome);
        outcome
    }
}

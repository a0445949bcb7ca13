//! Retrying uploader.

use std::collections::BTreeMap;

use bucketsync_core::{content_type_for, FileDigest, SyncTask};

use crate::backoff::retry;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::observer::SyncObserver;
use crate::remote::{ObjectStore, PutObjectRequest, RemoteError, DIGEST_METADATA_KEY};

/// Writes one object, retrying with Fibonacci backoff.
pub struct Uploader<'a> {
    store: &'a dyn ObjectStore,
    config: &'a SyncConfig,
    observer: &'a dyn SyncObserver,
}

impl<'a> Uploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a SyncConfig, observer: &'a dyn SyncObserver) -> Self {
        Self {
            store,
            config,
            observer,
        }
    }

    /// Build the write request for a task.
    pub fn request(&self, task: &SyncTask, key: &str, digest: &FileDigest) -> PutObjectRequest {
        let mut metadata = BTreeMap::new();
        metadata.insert(DIGEST_METADATA_KEY.to_string(), digest.to_hex());

        PutObjectRequest {
            bucket: self.config.bucket.clone(),
            key: key.to_string(),
            source: task.source_path().to_path_buf(),
            content_type: content_type_for(task.source_path()).map(str::to_string),
            acl: self.config.acl.clone(),
            cache_control: self.config.cache_control.clone(),
            metadata,
            headers: self.config.headers.clone(),
        }
    }

    /// Upload the task's file under `key`, stamped with `digest`.
    ///
    /// Returns the number of attempts it took.
    pub async fn upload(&self, task: &SyncTask, key: &str, digest: &FileDigest) -> Result<u32> {
        let request = self.request(task, key, digest);
        let mut attempts = 0u32;

        retry(
            key,
            &self.config.retry,
            |attempt, error: &RemoteError, delay| self.observer.on_upload_retry(key, attempt, error, delay),
            || {
                attempts += 1;
                self.store.put_object(&request)
            },
        )
        .await
        .map_err(|exhausted| SyncError::Upload {
            key: key.to_string(),
            attempts: exhausted.attempts,
            source: exhausted.last,
        })?;

        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::observer::RecordingObserver;
    use crate::remote::memory::MemoryBucket;
    use std::time::Duration;

    fn write_source(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> SyncTask {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        SyncTask::new(path, name)
    }

    #[tokio::test]
    async fn test_request_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_source(&dir, "app.css", b"body{}");
        let config = SyncConfig::new("site")
            .with_acl("private")
            .with_cache_control("no-cache")
            .with_header("x-amz-meta-team", "web");
        let bucket = MemoryBucket::new();
        let observer = RecordingObserver::new();
        let uploader = Uploader::new(&bucket, &config, &observer);
        let digest = FileDigest::from_bytes([3; 32]);

        let request = uploader.request(&task, "css/app.css", &digest);
        assert_eq!(request.bucket, "site");
        assert_eq!(request.key, "css/app.css");
        assert_eq!(request.content_type.as_deref(), Some("text/css"));
        assert_eq!(request.acl, "private");
        assert_eq!(request.cache_control, "no-cache");
        assert_eq!(
            request.metadata.get(DIGEST_METADATA_KEY),
            Some(&digest.to_hex())
        );
        assert_eq!(request.headers.get("x-amz-meta-team").map(String::as_str), Some("web"));

        assert_eq!(uploader.upload(&task, "css/app.css", &digest).await.unwrap(), 1);
        let stored = bucket.object("site", "css/app.css").unwrap();
        assert_eq!(&stored.body[..], b"body{}");
        assert_eq!(stored.stored_digest(), Some(digest.to_hex().as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_retries_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_source(&dir, "a.txt", b"a");
        let config = SyncConfig::new("site");
        let bucket = MemoryBucket::new();
        bucket.fail_puts("a.txt", 2, RemoteError::status(503, "SlowDown"));
        let observer = RecordingObserver::new();

        let uploader = Uploader::new(&bucket, &config, &observer);
        let attempts = uploader
            .upload(&task, "a.txt", &FileDigest::from_bytes([1; 32]))
            .await
            .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(bucket.put_attempts("a.txt"), 3);
        assert_eq!(
            observer.retries_for("a.txt"),
            vec![(1, Duration::from_secs(1)), (2, Duration::from_secs(1))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let task = write_source(&dir, "a.txt", b"a");
        let config = SyncConfig::new("site").with_retry(RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        });
        let bucket = MemoryBucket::new();
        bucket.fail_puts("a.txt", 10, RemoteError::status(500, "InternalError"));
        let observer = RecordingObserver::new();

        let err = Uploader::new(&bucket, &config, &observer)
            .upload(&task, "a.txt", &FileDigest::from_bytes([1; 32]))
            .await
            .unwrap_err();

        match err {
            SyncError::Upload { key, attempts, source } => {
                assert_eq!(key, "a.txt");
                assert_eq!(attempts, 3);
                assert_eq!(source, RemoteError::status(500, "InternalError"));
            }
            other => panic!("expected upload error, got {other:?}"),
        }
        assert_eq!(bucket.put_attempts("a.txt"), 3);
        assert_eq!(observer.retries_for("a.txt").len(), 2);
        assert!(bucket.object("site", "a.txt").is_none());
    }
}

//! Bounded fan-out of sync tasks.
//!
//! Tasks are pulled from the source only when a worker slot is free, so a
//! lazy iterator or a channel is never drained ahead of the pool. The first
//! failing task stops intake; tasks already in flight run to completion and
//! the first error is returned.

use std::collections::BTreeMap;

use bucketsync_core::{SyncOutcome, SyncTask};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::pipeline::SyncEngine;

/// Summary of a fully successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub skipped_cached: usize,
    pub skipped_remote_match: usize,
    /// Outcome per object key.
    pub outcomes: BTreeMap<String, SyncOutcome>,
}

impl SyncReport {
    pub fn record(&mut self, key: String, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Uploaded => self.uploaded += 1,
            SyncOutcome::SkippedCached => self.skipped_cached += 1,
            SyncOutcome::SkippedRemoteMatch => self.skipped_remote_match += 1,
        }
        self.outcomes.insert(key, outcome);
    }

    /// Number of tasks processed.
    pub fn total(&self) -> usize {
        self.uploaded + self.skipped_cached + self.skipped_remote_match
    }

    pub fn skipped(&self) -> usize {
        self.skipped_cached + self.skipped_remote_match
    }

    pub fn outcome(&self, key: &str) -> Option<SyncOutcome> {
        self.outcomes.get(key).copied()
    }
}

/// Where tasks come from.
trait TaskFeed {
    async fn next_task(&mut self) -> Option<SyncTask>;
}

struct IterFeed<I>(I);

impl<I: Iterator<Item = SyncTask>> TaskFeed for IterFeed<I> {
    async fn next_task(&mut self) -> Option<SyncTask> {
        self.0.next()
    }
}

struct ChannelFeed(mpsc::Receiver<SyncTask>);

impl TaskFeed for ChannelFeed {
    async fn next_task(&mut self) -> Option<SyncTask> {
        self.0.recv().await
    }
}

impl SyncEngine {
    /// Sync every task from an iterator, at most `concurrency` at a time.
    pub async fn run<I>(&self, tasks: I) -> Result<SyncReport>
    where
        I: IntoIterator<Item = SyncTask>,
    {
        self.drive(IterFeed(tasks.into_iter())).await
    }

    /// Sync every task received on a channel until all senders are dropped.
    pub async fn run_channel(&self, tasks: mpsc::Receiver<SyncTask>) -> Result<SyncReport> {
        self.drive(ChannelFeed(tasks)).await
    }

    async fn drive<F: TaskFeed>(&self, mut feed: F) -> Result<SyncReport> {
        let limit = self.config.concurrency;
        let mut in_flight: JoinSet<(String, Result<SyncOutcome>)> = JoinSet::new();
        let mut report = SyncReport::default();
        let mut first_error: Option<SyncError> = None;
        let mut exhausted = false;

        loop {
            let can_pull = first_error.is_none() && !exhausted && in_flight.len() < limit;
            if !can_pull && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    let failure = match joined {
                        Ok((key, Ok(outcome))) => {
                            report.record(key, outcome);
                            None
                        }
                        Ok((key, Err(e))) => {
                            warn!(key = %key, error = %e, "task failed");
                            Some(e)
                        }
                        Err(e) => Some(SyncError::TaskPanicked(e.to_string())),
                    };
                    if first_error.is_none() {
                        first_error = failure;
                    }
                }

                next = feed.next_task(), if can_pull => match next {
                    Some(task) => {
                        let engine = self.clone();
                        in_flight.spawn(async move {
                            let key = engine.object_key(&task);
                            let result = engine.sync_task(&task).await;
                            (key, result)
                        });
                    }
                    None => exhausted = true,
                },

                else => break,
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            total = report.total(),
            uploaded = report.uploaded,
            skipped_cached = report.skipped_cached,
            skipped_remote_match = report.skipped_remote_match,
            "sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, SyncConfig};
    use crate::remote::memory::MemoryBucket;
    use crate::remote::{ObjectMetadata, ObjectStore, PutObjectRequest, RemoteError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Bucket that records the peak number of concurrent requests.
    #[derive(Default)]
    struct GaugeBucket {
        inner: MemoryBucket,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GaugeBucket {
        async fn track<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            let out = fut.await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    #[async_trait]
    impl ObjectStore for GaugeBucket {
        async fn head_object(&self, bucket: &str, key: &str) -> std::result::Result<ObjectMetadata, RemoteError> {
            self.track(self.inner.head_object(bucket, key)).await
        }

        async fn put_object(&self, request: &PutObjectRequest) -> std::result::Result<(), RemoteError> {
            self.track(self.inner.put_object(request)).await
        }

        async fn get_object(&self, bucket: &str, key: &str) -> std::result::Result<Bytes, RemoteError> {
            self.inner.get_object(bucket, key).await
        }

        async fn put_bytes(&self, bucket: &str, key: &str, body: Bytes) -> std::result::Result<(), RemoteError> {
            self.inner.put_bytes(bucket, key, body).await
        }
    }

    fn write_tasks(dir: &tempfile::TempDir, count: usize) -> Vec<SyncTask> {
        (0..count)
            .map(|i| {
                let path = dir.path().join(format!("f{i:03}.txt"));
                std::fs::write(&path, format!("file {i}")).unwrap();
                SyncTask::new(path, format!("f{i:03}.txt"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_run_reports_every_task() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 10);
        let bucket = Arc::new(MemoryBucket::new());
        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(3), bucket.clone()).unwrap();

        let report = engine.run(tasks.clone()).await.unwrap();
        assert_eq!(report.total(), 10);
        assert_eq!(report.uploaded, 10);
        assert_eq!(report.outcome("f007.txt"), Some(SyncOutcome::Uploaded));

        let again = engine.run(tasks).await.unwrap();
        assert_eq!(again.uploaded, 0);
        assert_eq!(again.skipped_remote_match, 10);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let engine = SyncEngine::new(SyncConfig::new("site"), Arc::new(MemoryBucket::new())).unwrap();
        let report = engine.run(Vec::new()).await.unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 24);
        let bucket = Arc::new(GaugeBucket::default());
        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(4), bucket.clone()).unwrap();

        engine.run(tasks).await.unwrap();
        let peak = bucket.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak} exceeds limit");
        assert!(peak >= 2, "tasks never overlapped (peak {peak})");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_small_batches_run_together() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 3);
        let bucket = Arc::new(GaugeBucket::default());
        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(8), bucket.clone()).unwrap();

        engine.run(tasks).await.unwrap();
        let peak = bucket.peak.load(Ordering::SeqCst);
        assert_eq!(peak, 3, "every task should be in flight together");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_stops_intake() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 20);
        let bucket = Arc::new(MemoryBucket::new());
        bucket.fail_puts("f000.txt", 100, RemoteError::status(500, "InternalError"));

        let config = SyncConfig::new("site")
            .with_concurrency(1)
            .with_retry(RetryPolicy {
                max_attempts: 2,
                ..Default::default()
            });
        let engine = SyncEngine::new(config, bucket.clone()).unwrap();

        let err = engine.run(tasks).await.unwrap_err();
        assert!(matches!(err, SyncError::Upload { attempts: 2, .. }));
        // With one worker the failing first task is the only one ever started.
        assert_eq!(bucket.put_count(), 2);
        assert_eq!(bucket.head_count(), 1);
    }

    #[tokio::test]
    async fn test_lazy_iterator_is_not_drained_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 50);
        let bucket = Arc::new(MemoryBucket::new());
        bucket.fail_heads("f000.txt", RemoteError::status(403, "AccessDenied"));

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let lazy = tasks.into_iter().inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(2), bucket).unwrap();
        let err = engine.run(lazy).await.unwrap_err();

        assert!(matches!(err, SyncError::Remote { .. }));
        assert!(pulled.load(Ordering::SeqCst) < 50);
    }

    #[tokio::test]
    async fn test_channel_source() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(&dir, 12);
        let bucket = Arc::new(MemoryBucket::new());
        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(4), bucket.clone()).unwrap();

        let (tx, rx) = mpsc::channel(2);
        let producer = tokio::spawn(async move {
            for task in tasks {
                tx.send(task).await.unwrap();
            }
        });

        let report = engine.run_channel(rx).await.unwrap();
        producer.await.unwrap();
        assert_eq!(report.uploaded, 12);
        assert_eq!(bucket.keys("site").len(), 12);
    }

    #[tokio::test]
    async fn test_missing_source_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = write_tasks(&dir, 2);
        tasks.push(SyncTask::new(dir.path().join("missing.txt"), "missing.txt"));
        let engine = SyncEngine::new(SyncConfig::new("site").with_concurrency(1), Arc::new(MemoryBucket::new())).unwrap();

        let err = engine.run(tasks).await.unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}

//! Side-channel notifications.
//!
//! Observers see what the engine decides without being able to influence it.
//! All methods have empty defaults, so an implementation only overrides the
//! events it cares about.

use std::sync::Mutex;
use std::time::Duration;

use bucketsync_core::SyncOutcome;

use crate::remote::{InvalidationStatus, RemoteError};

/// Callback trait for sync progress.
pub trait SyncObserver: Send + Sync {
    /// A task finished without error.
    fn on_task_complete(&self, _key: &str, _outcome: SyncOutcome) {}

    /// An upload attempt failed and will be retried after `delay`.
    fn on_upload_retry(&self, _key: &str, _attempt: u32, _error: &RemoteError, _delay: Duration) {}

    /// An invalidation was accepted by the CDN.
    fn on_invalidation_created(&self, _distribution_id: &str, _invalidation_id: &str) {}

    /// A status poll returned.
    fn on_invalidation_status(&self, _invalidation_id: &str, _status: &InvalidationStatus) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    TaskComplete {
        key: String,
        outcome: SyncOutcome,
    },
    UploadRetry {
        key: String,
        attempt: u32,
        error: RemoteError,
        delay: Duration,
    },
    InvalidationCreated {
        distribution_id: String,
        invalidation_id: String,
    },
    InvalidationStatus {
        invalidation_id: String,
        status: InvalidationStatus,
    },
}

/// Observer that keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Retry events for one key.
    pub fn retries_for(&self, key: &str) -> Vec<(u32, Duration)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SyncEvent::UploadRetry {
                    key: k,
                    attempt,
                    delay,
                    ..
                } if k == key => Some((attempt, delay)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl SyncObserver for RecordingObserver {
    fn on_task_complete(&self, key: &str, outcome: SyncOutcome) {
        self.push(SyncEvent::TaskComplete {
            key: key.to_string(),
            outcome,
        });
    }

    fn on_upload_retry(&self, key: &str, attempt: u32, error: &RemoteError, delay: Duration) {
        self.push(SyncEvent::UploadRetry {
            key: key.to_string(),
            attempt,
            error: error.clone(),
            delay,
        });
    }

    fn on_invalidation_created(&self, distribution_id: &str, invalidation_id: &str) {
        self.push(SyncEvent::InvalidationCreated {
            distribution_id: distribution_id.to_string(),
            invalidation_id: invalidation_id.to_string(),
        });
    }

    fn on_invalidation_status(&self, invalidation_id: &str, status: &InvalidationStatus) {
        self.push(SyncEvent::InvalidationStatus {
            invalidation_id: invalidation_id.to_string(),
            status: status.clone(),
        });
    }
}

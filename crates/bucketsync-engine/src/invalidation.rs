//! CDN invalidation coordinator.
//!
//! ```text
//! Requested --create--> Polling --(sleep, get)*--> Completed
//!                          |
//!                          +-- max_wait exceeded --> InvalidationTimeout
//! ```
//!
//! Provider errors on create or get end the run immediately; they are not
//! retried.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::InvalidationPolicy;
use crate::error::{Result, SyncError};
use crate::observer::{NoopObserver, SyncObserver};
use crate::remote::{CdnClient, InvalidationRequest, RemoteError, INVALIDATE_ALL};

/// A completed invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub invalidation_id: String,
    /// Status queries issued, the final `Completed` one included.
    pub polls: u32,
    pub waited: Duration,
}

/// Issues an invalidation and waits for the CDN to finish it.
pub struct InvalidationCoordinator {
    cdn: Arc<dyn CdnClient>,
    policy: InvalidationPolicy,
    observer: Arc<dyn SyncObserver>,
}

impl InvalidationCoordinator {
    pub fn new(cdn: Arc<dyn CdnClient>, policy: InvalidationPolicy) -> Self {
        Self {
            cdn,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Invalidate every path of a distribution and wait for completion.
    pub async fn invalidate(&self, distribution_id: &str) -> Result<InvalidationOutcome> {
        let request = InvalidationRequest {
            distribution_id: distribution_id.to_string(),
            paths: vec![INVALIDATE_ALL.to_string()],
            caller_reference: caller_reference(),
        };
        let remote_err = |source: RemoteError| SyncError::Invalidation {
            distribution_id: distribution_id.to_string(),
            source,
        };

        let id = self
            .cdn
            .create_invalidation(&request)
            .await
            .map_err(remote_err)?;
        info!(distribution = distribution_id, invalidation = %id, "invalidation requested");
        self.observer.on_invalidation_created(distribution_id, &id);

        let interval = self.policy.poll_interval();
        let max_wait = self.policy.max_wait();
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            sleep(interval).await;
            polls += 1;

            let status = self
                .cdn
                .get_invalidation(distribution_id, &id)
                .await
                .map_err(remote_err)?;
            self.observer.on_invalidation_status(&id, &status);

            let waited = start.elapsed();
            if status.is_completed() {
                info!(invalidation = %id, polls, waited = ?waited, "invalidation completed");
                return Ok(InvalidationOutcome {
                    invalidation_id: id,
                    polls,
                    waited,
                });
            }

            debug!(invalidation = %id, status = %status, polls, "invalidation pending");
            if let Some(limit) = max_wait {
                if waited >= limit {
                    return Err(SyncError::InvalidationTimeout { id, waited });
                }
            }
        }
    }
}

/// Unique-per-second token: the current Unix time in seconds.
fn caller_reference() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

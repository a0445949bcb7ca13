//! Retry with Fibonacci backoff.
//!
//! Delays run `initial, initial, 2*initial, 3*initial, 5*initial, ...`, each
//! capped at the policy's maximum. With the default policy (7 attempts,
//! 1 s initial, 10 s cap) a failing operation sleeps 1, 1, 2, 3, 5 and 8
//! seconds before giving up.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryPolicy;

/// Iterator over capped Fibonacci delays.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev: Duration,
    curr: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            curr: initial,
            max,
        }
    }

    pub fn from_policy(policy: &RetryPolicy) -> Self {
        Self::new(policy.initial_delay(), policy.max_delay())
    }
}

impl Iterator for FibonacciBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.curr.min(self.max);
        let next = self.prev.saturating_add(self.curr);
        self.prev = self.curr;
        // Stop growing once past the cap so the sum cannot overflow.
        self.curr = next.min(self.max.saturating_add(self.max));
        Some(delay)
    }
}

/// Terminal failure of [`retry`]: the attempt count and the last error.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `operation` until it succeeds or the policy's attempts run out.
///
/// `on_retry(attempt, &error, delay)` is called after every failed attempt
/// that will be retried, before the backoff sleep.
pub async fn retry<F, Fut, T, E, R>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut on_retry: R,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: FnMut(u32, &E, Duration),
{
    let mut delays = FibonacciBackoff::from_policy(policy);
    let mut attempts = 0u32;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(operation = operation_name, retries = attempts, "succeeded after retries");
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;
                if attempts >= policy.max_attempts {
                    return Err(RetryExhausted { attempts, last: err });
                }

                let delay = delays.next().unwrap_or_else(|| policy.max_delay());
                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    delay = ?delay,
                    "failed, retrying"
                );
                on_retry(attempts, &err, delay);
                sleep(delay).await;
            }
        }
    }
}

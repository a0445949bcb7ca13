//! Configuration for the sync engine.
//!
//! # Example
//!
//! ```
//! use bucketsync_engine::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::new("my-site");
//! assert_eq!(config.concurrency, 16);
//! assert_eq!(config.retry.max_attempts, 7);
//!
//! // Adjusted config
//! let config = SyncConfig::new("my-site")
//!     .with_prefix("v2/")
//!     .with_region("eu-west-1")
//!     .with_concurrency(4)
//!     .with_distribution("E2EXAMPLE");
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use bucketsync_core::{Endpoint, Headers};
use serde::Deserialize;

use crate::error::ConfigError;

/// Everything the engine needs to know about one publishing target.
///
/// All fields except `bucket` have defaults, so the orchestration layer can
/// deserialize this from a sparse config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncConfig {
    /// Target bucket name.
    pub bucket: String,

    /// Prepended verbatim to every object key (e.g. "v2/").
    #[serde(default)]
    pub prefix: String,

    /// Bucket region. `None` or "us-standard" selects the global endpoint.
    #[serde(default)]
    pub region: Option<String>,

    /// Render destination URLs with https (default) or http.
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// CDN distribution to invalidate after a successful run.
    #[serde(default)]
    pub distribution_id: Option<String>,

    /// Maximum number of tasks in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upload every task, ignoring the cache and remote digests.
    #[serde(default)]
    pub force: bool,

    /// Canned ACL for uploaded objects.
    #[serde(default = "default_acl")]
    pub acl: String,

    /// Cache-Control header for uploaded objects.
    #[serde(default = "default_cache_control")]
    pub cache_control: String,

    /// Extra upload headers. Part of every digest.
    #[serde(default)]
    pub headers: Headers,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub invalidation: InvalidationPolicy,

    /// Object key the cache snapshot is stored under.
    #[serde(default = "default_cache_object_key")]
    pub cache_object_key: String,
}

/// Upload retry schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per upload, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First Fibonacci delay in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Cap on any single delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Invalidation polling schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvalidationPolicy {
    /// Delay before each status query, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up after this long. `None` waits forever.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

fn default_secure() -> bool { true }
fn default_concurrency() -> usize { 16 }
fn default_acl() -> String { "public-read".to_string() }
fn default_cache_control() -> String { "max-age=86400".to_string() }
fn default_cache_object_key() -> String { "/.sync".to_string() }
fn default_max_attempts() -> u32 { 7 }
fn default_initial_delay_ms() -> u64 { 1_000 }
fn default_max_delay_ms() -> u64 { 10_000 }
fn default_poll_interval_ms() -> u64 { 5_000 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for InvalidationPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: None,
        }
    }
}

impl InvalidationPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            region: None,
            secure: default_secure(),
            distribution_id: None,
            concurrency: default_concurrency(),
            force: false,
            acl: default_acl(),
            cache_control: default_cache_control(),
            headers: Headers::new(),
            retry: RetryPolicy::default(),
            invalidation: InvalidationPolicy::default(),
            cache_object_key: default_cache_object_key(),
        }
    }
}

impl SyncConfig {
    /// Defaults for the given bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_distribution(mut self, distribution_id: impl Into<String>) -> Self {
        self.distribution_id = Some(distribution_id.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = acl.into();
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = cache_control.into();
        self
    }

    /// Add one extra upload header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_invalidation(mut self, invalidation: InvalidationPolicy) -> Self {
        self.invalidation = invalidation;
        self
    }

    pub fn with_cache_object_key(mut self, key: impl Into<String>) -> Self {
        self.cache_object_key = key.into();
        self
    }

    /// The endpoint destination URLs are rendered against.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.region.as_deref(), self.secure)
    }

    /// Check the configuration once, before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::DelayOrder {
                initial: self.retry.initial_delay(),
                max: self.retry.max_delay(),
            });
        }
        if self.invalidation.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.cache_object_key.is_empty() {
            return Err(ConfigError::EmptyCacheObjectKey);
        }
        Ok(())
    }
}

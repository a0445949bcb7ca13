//! Error types for the sync engine.

use std::path::PathBuf;
use std::time::Duration;

use bucketsync_core::CoreError;
use thiserror::Error;

use crate::remote::RemoteError;

/// Configuration rejected by [`SyncConfig::validate`](crate::SyncConfig::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bucket name must not be empty")]
    EmptyBucket,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("retry policy must allow at least one attempt")]
    ZeroAttempts,

    #[error("max retry delay {max:?} is shorter than initial delay {initial:?}")]
    DelayOrder { initial: Duration, max: Duration },

    #[error("invalidation poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("cache object key must not be empty")]
    EmptyCacheObjectKey,
}

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local source file could not be read. Not retried.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Digest computation failed for a reason other than I/O.
    #[error("digest error: {0}")]
    Digest(CoreError),

    /// The bucket answered a probe with something other than not-found. Not retried.
    #[error("probe of {key} failed: {source}")]
    Remote {
        key: String,
        #[source]
        source: RemoteError,
    },

    /// Every upload attempt failed; carries the last provider error.
    #[error("upload of {key} failed after {attempts} attempts: {source}")]
    Upload {
        key: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// The change cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] bucketsync_cache::CacheError),

    /// Creating or polling an invalidation failed.
    #[error("invalidation on {distribution_id} failed: {source}")]
    Invalidation {
        distribution_id: String,
        #[source]
        source: RemoteError,
    },

    /// The invalidation did not complete within the configured bound.
    #[error("invalidation {id} not completed after {waited:?}")]
    InvalidationTimeout { id: String, waited: Duration },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A worker task panicked or was cancelled.
    #[error("sync task panicked: {0}")]
    TaskPanicked(String),
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io { path, source } => SyncError::Io { path, source },
            other => SyncError::Digest(other),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

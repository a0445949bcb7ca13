//! Error types for the publisher.

use bucketsync_cache::CacheError;
use bucketsync_engine::{RemoteError, SyncError};
use thiserror::Error;

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Sync or invalidation error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Reading or writing the cache snapshot object failed.
    #[error("cache snapshot {key}: {source}")]
    Snapshot {
        key: String,
        #[source]
        source: RemoteError,
    },

    /// A cache operation was requested but no cache is attached.
    #[error("no change cache configured")]
    NoCache,

    /// A distribution is configured but no CDN client was supplied.
    #[error("distribution {0} configured without a CDN client")]
    NoCdnClient(String),
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, PublishError>;

//! Error types for the cache module.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A snapshot line could not be parsed.
    #[error("snapshot line {line}: {message}")]
    Snapshot { line: usize, message: String },

    /// Entry serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding the cache was poisoned by a panicking writer.
    #[error("cache lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking cache task was cancelled or panicked.
    #[error("cache task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

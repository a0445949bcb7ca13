//! Error types for bucketsync core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building tasks or computing digests.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The source file could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reader without a backing path failed.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    /// A source path does not live under the declared source root.
    #[error("{path} is not under source root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// A stored digest string is not 64 hex characters.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

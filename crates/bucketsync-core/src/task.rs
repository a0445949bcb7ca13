//! Sync tasks and outcomes.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, Result};

/// One local file bound to one bucket-relative destination.
///
/// Tasks are immutable and consumed exactly once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncTask {
    source_path: PathBuf,
    destination: String,
}

impl SyncTask {
    /// Create a task. Backslashes in the destination become forward slashes.
    pub fn new(source_path: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            destination: destination.into().replace('\\', "/"),
        }
    }

    /// Create a task whose destination is the source path relative to `root`.
    pub fn under_root(root: &Path, source_path: impl Into<PathBuf>) -> Result<Self> {
        let source_path = source_path.into();
        let relative = source_path
            .strip_prefix(root)
            .map_err(|_| CoreError::OutsideRoot {
                path: source_path.clone(),
                root: root.to_path_buf(),
            })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(CoreError::OutsideRoot {
                        path: source_path.clone(),
                        root: root.to_path_buf(),
                    })
                }
            }
        }

        let destination = parts.join("/");
        Ok(Self {
            source_path,
            destination,
        })
    }

    /// Absolute path of the local file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Bucket-relative destination path, before any key prefix.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Object key for this task under the given prefix.
    pub fn object_key(&self, prefix: &str) -> String {
        normalize_key(prefix, &self.destination)
    }
}

/// Build an object key: prefix + path with one leading `/` removed and all
/// backslashes turned into forward slashes.
pub fn normalize_key(prefix: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.strip_prefix('/').unwrap_or(&path);
    format!("{}{}", prefix, path).replace('\\', "/")
}

/// What the pipeline decided for a task that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// The change cache already held this digest; the bucket was not contacted.
    SkippedCached,
    /// The remote object already carried this digest.
    SkippedRemoteMatch,
    /// The object was written.
    Uploaded,
}

impl SyncOutcome {
    /// Whether the object was written.
    pub fn is_upload(&self) -> bool {
        matches!(self, SyncOutcome::Uploaded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::SkippedCached => "skipped-cached",
            SyncOutcome::SkippedRemoteMatch => "skipped-remote-match",
            SyncOutcome::Uploaded => "uploaded",
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

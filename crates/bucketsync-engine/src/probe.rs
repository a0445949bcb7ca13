//! Remote state probing and the upload decision.

use bucketsync_core::FileDigest;

use crate::error::{Result, SyncError};
use crate::remote::ObjectStore;

/// What a HEAD request revealed about an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectMetadata {
    pub exists: bool,
    /// Digest tag on the object, if it has one.
    pub stored_digest: Option<String>,
}

impl RemoteObjectMetadata {
    pub fn absent() -> Self {
        Self {
            exists: false,
            stored_digest: None,
        }
    }
}

/// Why a task is being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    Absent,
    Forced,
    DigestMismatch,
}

/// Decision after probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDecision {
    Upload(UploadReason),
    /// The remote object already carries the digest.
    Matches,
}

/// Query the bucket for an object's digest tag.
///
/// Not-found is an answer, not an error. Any other provider error fails the
/// task without retry.
pub async fn probe(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<RemoteObjectMetadata> {
    match store.head_object(bucket, key).await {
        Ok(head) => Ok(RemoteObjectMetadata {
            exists: true,
            stored_digest: head.stored_digest().map(str::to_string),
        }),
        Err(e) if e.is_not_found() => Ok(RemoteObjectMetadata::absent()),
        Err(source) => Err(SyncError::Remote {
            key: key.to_string(),
            source,
        }),
    }
}

/// Decide whether to upload given what the probe found.
pub fn decide(remote: &RemoteObjectMetadata, digest: &FileDigest, force: bool) -> ProbeDecision {
    if !remote.exists {
        return ProbeDecision::Upload(UploadReason::Absent);
    }
    if force {
        return ProbeDecision::Upload(UploadReason::Forced);
    }
    match &remote.stored_digest {
        Some(stored) if digest.matches_hex(stored) => ProbeDecision::Matches,
        _ => ProbeDecision::Upload(UploadReason::DigestMismatch),
    }
}

//! # bucketsync core
//!
//! Pure primitives for the bucketsync publisher: content digests, sync tasks,
//! object keys and destination URLs.
//!
//! Apart from reading the source file while hashing, this crate does no I/O.
//! It has no notion of buckets, caches or CDNs beyond the strings that name
//! them.
//!
//! ## Key Types
//!
//! - [`FileDigest`] - 32-byte BLAKE3 fingerprint of (headers, destination URL, file bytes)
//! - [`SyncTask`] - One local file bound to one bucket-relative destination
//! - [`SyncOutcome`] - What the pipeline decided for a task
//! - [`Endpoint`] - Renders the destination URL that a digest is bound to
//!
//! ## Digests
//!
//! A digest is not a plain content hash. Hashing the destination URL and the
//! upload headers ahead of the file bytes means the same file published to two
//! keys, or under two header policies, gets two different digests. See
//! [`digest`] module.

pub mod content_type;
pub mod digest;
pub mod error;
pub mod location;
pub mod task;
pub mod types;

pub use content_type::content_type_for;
pub use digest::{digest_file, digest_reader, DigestBuilder, Headers, READ_CHUNK_SIZE};
pub use error::{CoreError, Result};
pub use location::Endpoint;
pub use task::{normalize_key, SyncOutcome, SyncTask};
pub use types::FileDigest;

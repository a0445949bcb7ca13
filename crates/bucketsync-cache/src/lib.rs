//! # bucketsync cache
//!
//! The change cache: a key-value map from `digest:<cache key>` to the hex
//! digest a file had when it was last confirmed in the bucket.
//!
//! ## Overview
//!
//! The sync engine consults the cache before probing the bucket. A hit that
//! equals the freshly computed digest skips the task without any network
//! call. The cache is advisory: a stale entry costs at most one redundant
//! upload attempt, because the remote probe stays authoritative.
//!
//! ## Key Types
//!
//! - [`ChangeCache`] - The async trait every backend implements
//! - [`CacheExt`] - Digest-typed helpers applying the `digest:` key prefix
//! - [`SqliteCache`] - SQLite-backed persistent cache
//! - [`MemoryCache`] - In-memory cache for tests and one-shot runs
//! - [`snapshot`] - Newline-delimited JSON dump used to ship the cache
//!   inside the bucket between runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bucketsync_cache::{CacheExt, SqliteCache};
//! use bucketsync_core::FileDigest;
//!
//! async fn example() {
//!     let cache = SqliteCache::open(".bucketsync.db").unwrap();
//!     let digest = FileDigest::from_bytes([0u8; 32]);
//!
//!     cache.store_digest("/site/index.html", &digest).await.unwrap();
//!     let hit = cache.lookup_digest("/site/index.html").await.unwrap();
//!     assert_eq!(hit, Some(digest));
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use snapshot::{decode_snapshot, encode_snapshot};
pub use sqlite::SqliteCache;
pub use traits::{digest_key, CacheEntry, CacheExt, ChangeCache, DIGEST_KEY_PREFIX};

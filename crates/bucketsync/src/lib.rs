//! # bucketsync
//!
//! Incremental publishing of a directory of static assets to an object
//! storage bucket, followed by a CDN invalidation.
//!
//! ## Overview
//!
//! Each file is fingerprinted together with its destination URL and the
//! upload headers. A file is uploaded only when that fingerprint differs
//! from the one remembered in the change cache or stamped on the remote
//! object, so re-running a deploy with nothing changed issues no uploads.
//!
//! - **Change detection**: BLAKE3 digest, optional local cache, remote tag
//! - **Upload**: bounded concurrency, Fibonacci retry, fail-fast
//! - **Invalidation**: requested only after a fully successful sync, then
//!   polled until the CDN reports completion
//! - **Portable cache**: the cache can be shipped in the bucket itself
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bucketsync::{MemoryBucket, MemoryCdn, Publisher, SqliteCache, SyncConfig, SyncTask};
//!
//! async fn example() {
//!     let config = SyncConfig::new("my-site").with_distribution("E2EXAMPLE");
//!     let publisher = Publisher::new(config, Arc::new(MemoryBucket::new()))
//!         .unwrap()
//!         .with_cdn(Arc::new(MemoryCdn::new()))
//!         .with_cache(Arc::new(SqliteCache::open(".bucketsync.db").unwrap()));
//!
//!     publisher.pull_cache().await.unwrap();
//!     let tasks = vec![SyncTask::new("/srv/site/index.html", "index.html")];
//!     let report = publisher.publish(tasks).await.unwrap();
//!     publisher.push_cache().await.unwrap();
//!
//!     println!("uploaded {}", report.sync.uploaded);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `bucketsync::core` - Digests, tasks, keys and URLs
//! - `bucketsync::cache` - Change cache trait, SQLite and in-memory backends
//! - `bucketsync::engine` - Pipeline, scheduler, provider traits, invalidation

pub mod error;
pub mod publisher;

// Re-export component crates
pub use bucketsync_cache as cache;
pub use bucketsync_core as core;
pub use bucketsync_engine as engine;

// Re-export main types for convenience
pub use error::{PublishError, Result};
pub use publisher::{PublishReport, Publisher};

pub use bucketsync_cache::{CacheExt, ChangeCache, MemoryCache, SqliteCache};
pub use bucketsync_core::{FileDigest, SyncOutcome, SyncTask};
pub use bucketsync_engine::{
    CdnClient, InvalidationPolicy, InvalidationStatus, MemoryBucket, MemoryCdn, ObjectStore,
    RemoteError, RetryPolicy, SyncConfig, SyncError, SyncObserver, SyncReport,
};

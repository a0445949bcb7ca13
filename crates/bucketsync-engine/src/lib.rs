//! # bucketsync engine
//!
//! Uploads only the files whose content changed since the last successful
//! sync, with bounded concurrency and retry, then invalidates the CDN.
//!
//! ## Overview
//!
//! Every task runs the same pipeline:
//!
//! ```text
//! digest --> cache lookup --hit--> skipped-cached
//!                 |
//!                miss
//!                 v
//!              probe --match--> skipped-remote-match
//!                 |
//!          absent/mismatch/force
//!                 v
//!          upload (Fibonacci retry) --> uploaded
//! ```
//!
//! The scheduler fans tasks out over at most `concurrency` workers and stops
//! taking new tasks at the first failure. Only a fully successful run should
//! be followed by [`InvalidationCoordinator::invalidate`].
//!
//! ## Key Types
//!
//! - [`SyncEngine`] - Runs tasks through the pipeline
//! - [`SyncConfig`] - Target bucket, upload attributes, retry and poll policy
//! - [`ObjectStore`] / [`CdnClient`] - Provider seams
//! - [`InvalidationCoordinator`] - Create-then-poll CDN invalidation
//! - [`SyncObserver`] - Side channel for retries and outcomes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bucketsync_core::SyncTask;
//! use bucketsync_engine::{MemoryBucket, SyncConfig, SyncEngine};
//!
//! async fn example() {
//!     let bucket = Arc::new(MemoryBucket::new());
//!     let engine = SyncEngine::new(SyncConfig::new("my-site"), bucket).unwrap();
//!
//!     let tasks = vec![SyncTask::new("/srv/site/index.html", "index.html")];
//!     let report = engine.run(tasks).await.unwrap();
//!     println!("uploaded {} of {}", report.uploaded, report.total());
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod observer;
pub mod pipeline;
pub mod probe;
pub mod remote;
pub mod scheduler;
pub mod upload;

pub use backoff::{retry, FibonacciBackoff, RetryExhausted};
pub use config::{InvalidationPolicy, RetryPolicy, SyncConfig};
pub use error::{ConfigError, Result, SyncError};
pub use invalidation::{InvalidationCoordinator, InvalidationOutcome};
pub use observer::{NoopObserver, RecordingObserver, SyncEvent, SyncObserver};
pub use pipeline::{source_path_key, CacheKeyFn, SyncEngine};
pub use probe::{decide, probe, ProbeDecision, RemoteObjectMetadata, UploadReason};
pub use remote::{
    memory::MemoryBucket, memory::MemoryCdn, memory::StoredObject, CdnClient, InvalidationRequest,
    InvalidationStatus, ObjectMetadata, ObjectStore, PutObjectRequest, RemoteError,
    DIGEST_METADATA_KEY, INVALIDATE_ALL,
};
pub use scheduler::SyncReport;
pub use upload::Uploader;

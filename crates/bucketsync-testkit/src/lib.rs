//! # bucketsync testkit
//!
//! Testing utilities for bucketsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Temporary source trees wired to in-memory bucket, CDN and cache
//! - **Generators**: Proptest strategies for paths, file bodies, headers and whole sites
//! - **Doubles**: A latency-adding store that measures concurrency, and a cache that always fails
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use bucketsync_testkit::generators::SiteSpec;
//!
//! proptest! {
//!     #[test]
//!     fn second_run_uploads_nothing(site: SiteSpec) {
//!         // write site.files into a SourceTree, run twice, assert zero uploads
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use bucketsync_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.tree.write("index.html", "<h1>hello</h1>");
//! assert_eq!(fixture.tree.tasks().len(), 1);
//! ```

pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use doubles::{BrokenCache, GaugeStore};
pub use fixtures::{SourceTree, TestFixture, TEST_BUCKET, TEST_DISTRIBUTION};
pub use generators::SiteSpec;

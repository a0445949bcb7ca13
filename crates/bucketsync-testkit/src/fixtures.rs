//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bucketsync_cache::MemoryCache;
use bucketsync_core::SyncTask;
use bucketsync_engine::{MemoryBucket, MemoryCdn, SyncConfig, SyncEngine};
use tempfile::TempDir;

/// Bucket name used by [`TestFixture`].
pub const TEST_BUCKET: &str = "test-site";

/// Distribution id used by [`TestFixture`].
pub const TEST_DISTRIBUTION: &str = "E2TESTDIST";

/// A temporary directory of source files, removed on drop.
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file in the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, body: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, body).expect("write source file");
        path
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).expect("remove source file");
    }

    /// Task for one file, destination relative to the tree root.
    pub fn task(&self, relative: &str) -> SyncTask {
        SyncTask::under_root(self.root(), self.path(relative)).expect("path under root")
    }

    /// Tasks for every file in the tree, sorted by destination.
    pub fn tasks(&self) -> Vec<SyncTask> {
        let mut files = Vec::new();
        collect_files(self.root(), &mut files);
        files.sort();
        files
            .into_iter()
            .map(|path| SyncTask::under_root(self.root(), path).expect("path under root"))
            .collect()
    }
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// A source tree plus in-memory bucket, CDN and cache.
pub struct TestFixture {
    pub tree: SourceTree,
    pub bucket: Arc<MemoryBucket>,
    pub cdn: Arc<MemoryCdn>,
    pub cache: Arc<MemoryCache>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_cdn(MemoryCdn::new())
    }

    /// Use a CDN with scripted statuses.
    pub fn with_cdn(cdn: MemoryCdn) -> Self {
        Self {
            tree: SourceTree::new(),
            bucket: Arc::new(MemoryBucket::new()),
            cdn: Arc::new(cdn),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    /// Default configuration targeting the fixture bucket and distribution.
    pub fn config(&self) -> SyncConfig {
        SyncConfig::new(TEST_BUCKET).with_distribution(TEST_DISTRIBUTION)
    }

    /// Engine over the fixture bucket and cache.
    pub fn engine(&self, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(config, self.bucket.clone())
            .expect("valid config")
            .with_cache(self.cache.clone())
    }

    /// Stored digest tag of an object in the fixture bucket.
    pub fn remote_digest(&self, key: &str) -> Option<String> {
        self.bucket
            .object(TEST_BUCKET, key)
            .and_then(|o| o.stored_digest().map(str::to_string))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_tasks_are_relative_and_sorted() {
        let tree = SourceTree::new();
        tree.write("index.html", "<html>");
        tree.write("css/app.css", "body{}");
        tree.write("js/vendor/lib.js", "1");

        let destinations: Vec<_> = tree
            .tasks()
            .iter()
            .map(|t| t.destination().to_string())
            .collect();
        assert_eq!(destinations, vec!["css/app.css", "index.html", "js/vendor/lib.js"]);
    }

    #[tokio::test]
    async fn test_fixture_engine_uploads() {
        let fx = TestFixture::new();
        fx.tree.write("a.txt", "a");

        let report = fx.engine(fx.config()).run(fx.tree.tasks()).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(fx.remote_digest("a.txt").is_some());
    }
}

//! Provider abstractions for the bucket and the CDN.
//!
//! The engine never talks HTTP itself. Callers plug in an [`ObjectStore`] and
//! a [`CdnClient`] backed by whatever SDK and credentials they have; the
//! in-memory implementations in [`memory`] back tests and dry runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use bucketsync_core::Headers;
use bytes::Bytes;
use thiserror::Error;

/// User metadata name that carries a file's digest on the remote object.
pub const DIGEST_METADATA_KEY: &str = "syncfilehash";

/// Path pattern every invalidation covers.
pub const INVALIDATE_ALL: &str = "/*";

/// Error reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The object does not exist.
    #[error("not found")]
    NotFound,

    /// The provider answered with an error status.
    #[error("bad status code: {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        RemoteError::Status {
            code,
            message: message.into(),
        }
    }

    /// Whether this error means the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RemoteError::NotFound | RemoteError::Status { code: 404, .. }
        )
    }
}

/// Metadata returned by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// User metadata, keyed without any provider prefix.
    pub metadata: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub size: u64,
}

impl ObjectMetadata {
    /// The digest tag stamped by a previous sync, if any.
    pub fn stored_digest(&self) -> Option<&str> {
        self.metadata.get(DIGEST_METADATA_KEY).map(String::as_str)
    }
}

/// One object write, with the body streamed from a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub source: PathBuf,
    pub content_type: Option<String>,
    pub acl: String,
    pub cache_control: String,
    pub metadata: BTreeMap<String, String>,
    /// Extra headers merged over the standard ones.
    pub headers: Headers,
}

/// Bucket operations used by the engine.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata without the body.
    ///
    /// A missing object must be reported as an error for which
    /// [`RemoteError::is_not_found`] is true.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError>;

    /// Write an object from a local file.
    async fn put_object(&self, request: &PutObjectRequest) -> Result<(), RemoteError>;

    /// Read a whole object into memory.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError>;

    /// Write an in-memory body with no extra attributes.
    async fn put_bytes(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError>;
}

/// Invalidation request covering a set of paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub distribution_id: String,
    pub paths: Vec<String>,
    /// Token distinguishing this request from earlier ones. Only uniqueness
    /// is required; it is not an idempotency key.
    pub caller_reference: String,
}

/// Status of an invalidation as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationStatus {
    InProgress,
    Completed,
    /// Any other provider string, kept verbatim.
    Other(String),
}

impl InvalidationStatus {
    /// Parse the provider's status string.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "InProgress" => InvalidationStatus::InProgress,
            "Completed" => InvalidationStatus::Completed,
            other => InvalidationStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InvalidationStatus::InProgress => "InProgress",
            InvalidationStatus::Completed => "Completed",
            InvalidationStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, InvalidationStatus::Completed)
    }
}

impl fmt::Display for InvalidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CDN operations used by the invalidation coordinator.
#[async_trait]
pub trait CdnClient: Send + Sync {
    /// Create an invalidation and return its id.
    async fn create_invalidation(&self, request: &InvalidationRequest) -> Result<String, RemoteError>;

    /// Current status of an invalidation.
    async fn get_invalidation(
        &self,
        distribution_id: &str,
        invalidation_id: &str,
    ) -> Result<InvalidationStatus, RemoteError>;
}

/// In-memory providers for tests and dry runs.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// An object as stored by [`MemoryBucket`].
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct StoredObject {
        pub body: Bytes,
        pub content_type: Option<String>,
        pub acl: Option<String>,
        pub cache_control: Option<String>,
        pub metadata: BTreeMap<String, String>,
        pub headers: Headers,
    }

    impl StoredObject {
        pub fn stored_digest(&self) -> Option<&str> {
            self.metadata.get(DIGEST_METADATA_KEY).map(String::as_str)
        }
    }

    /// In-memory bucket with failure injection.
    #[derive(Default)]
    pub struct MemoryBucket {
        objects: Mutex<BTreeMap<(String, String), StoredObject>>,
        /// Remaining scripted put failures per key.
        put_failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
        /// Persistent head failures per key.
        head_failures: Mutex<HashMap<String, RemoteError>>,
        put_attempts: Mutex<HashMap<String, usize>>,
        heads: AtomicUsize,
        puts: AtomicUsize,
    }

    impl MemoryBucket {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an object.
        pub fn insert(&self, bucket: &str, key: &str, object: StoredObject) {
            lock(&self.objects).insert((bucket.to_string(), key.to_string()), object);
        }

        pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
            lock(&self.objects)
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }

        /// Keys stored in a bucket, sorted.
        pub fn keys(&self, bucket: &str) -> Vec<String> {
            lock(&self.objects)
                .keys()
                .filter(|(b, _)| b == bucket)
                .map(|(_, k)| k.clone())
                .collect()
        }

        /// Fail the next `times` puts of `key` with `error`.
        pub fn fail_puts(&self, key: &str, times: usize, error: RemoteError) {
            let mut failures = lock(&self.put_failures);
            let queue = failures.entry(key.to_string()).or_default();
            queue.extend(std::iter::repeat(error).take(times));
        }

        /// Fail every head of `key` with `error`.
        pub fn fail_heads(&self, key: &str, error: RemoteError) {
            lock(&self.head_failures).insert(key.to_string(), error);
        }

        /// Number of put attempts for `key`, failed ones included.
        pub fn put_attempts(&self, key: &str) -> usize {
            lock(&self.put_attempts).get(key).copied().unwrap_or(0)
        }

        /// Total put attempts across all keys.
        pub fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }

        /// Total head requests across all keys.
        pub fn head_count(&self) -> usize {
            self.heads.load(Ordering::SeqCst)
        }

        fn record_put(&self, key: &str) -> Option<RemoteError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            *lock(&self.put_attempts).entry(key.to_string()).or_default() += 1;
            lock(&self.put_failures)
                .get_mut(key)
                .and_then(VecDeque::pop_front)
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryBucket {
        async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError> {
            self.heads.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = lock(&self.head_failures).get(key) {
                return Err(err.clone());
            }

            let objects = lock(&self.objects);
            let object = objects
                .get(&(bucket.to_string(), key.to_string()))
                .ok_or(RemoteError::NotFound)?;
            Ok(ObjectMetadata {
                metadata: object.metadata.clone(),
                content_type: object.content_type.clone(),
                cache_control: object.cache_control.clone(),
                size: object.body.len() as u64,
            })
        }

        async fn put_object(&self, request: &PutObjectRequest) -> Result<(), RemoteError> {
            if let Some(err) = self.record_put(&request.key) {
                return Err(err);
            }

            let body = tokio::fs::read(&request.source)
                .await
                .map_err(|e| RemoteError::Transport(format!("{}: {}", request.source.display(), e)))?;

            let object = StoredObject {
                body: Bytes::from(body),
                content_type: request.content_type.clone(),
                acl: Some(request.acl.clone()),
                cache_control: Some(request.cache_control.clone()),
                metadata: request.metadata.clone(),
                headers: request.headers.clone(),
            };
            self.insert(&request.bucket, &request.key, object);
            Ok(())
        }

        async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError> {
            lock(&self.objects)
                .get(&(bucket.to_string(), key.to_string()))
                .map(|o| o.body.clone())
                .ok_or(RemoteError::NotFound)
        }

        async fn put_bytes(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError> {
            if let Some(err) = self.record_put(key) {
                return Err(err);
            }
            let object = StoredObject {
                body,
                ..Default::default()
            };
            self.insert(bucket, key, object);
            Ok(())
        }
    }

    /// In-memory CDN that replays scripted statuses.
    ///
    /// Each status query pops the next scripted status; once the script is
    /// exhausted every query reports `Completed`.
    #[derive(Default)]
    pub struct MemoryCdn {
        script: Mutex<VecDeque<InvalidationStatus>>,
        requests: Mutex<Vec<InvalidationRequest>>,
        create_failure: Mutex<Option<RemoteError>>,
        polls: AtomicUsize,
    }

    impl MemoryCdn {
        pub fn new() -> Self {
            Self::default()
        }

        /// Statuses returned by successive polls.
        pub fn with_statuses(statuses: impl IntoIterator<Item = InvalidationStatus>) -> Self {
            Self {
                script: Mutex::new(statuses.into_iter().collect()),
                ..Default::default()
            }
        }

        /// Make every create call fail.
        pub fn fail_create(&self, error: RemoteError) {
            *lock(&self.create_failure) = Some(error);
        }

        /// Invalidation requests received so far.
        pub fn requests(&self) -> Vec<InvalidationRequest> {
            lock(&self.requests).clone()
        }

        /// Number of status queries answered.
        pub fn poll_count(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CdnClient for MemoryCdn {
        async fn create_invalidation(&self, request: &InvalidationRequest) -> Result<String, RemoteError> {
            if let Some(err) = lock(&self.create_failure).clone() {
                return Err(err);
            }
            let mut requests = lock(&self.requests);
            requests.push(request.clone());
            Ok(format!("I{:04}", requests.len()))
        }

        async fn get_invalidation(
            &self,
            _distribution_id: &str,
            _invalidation_id: &str,
        ) -> Result<InvalidationStatus, RemoteError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.script)
                .pop_front()
                .unwrap_or(InvalidationStatus::Completed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryBucket, MemoryCdn, StoredObject};
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(RemoteError::NotFound.is_not_found());
        assert!(RemoteError::status(404, "NoSuchKey").is_not_found());
        assert!(!RemoteError::status(403, "AccessDenied").is_not_found());
        assert!(!RemoteError::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(InvalidationStatus::from_provider("InProgress"), InvalidationStatus::InProgress);
        assert!(InvalidationStatus::from_provider("Completed").is_completed());
        let other = InvalidationStatus::from_provider("Throttled");
        assert_eq!(other, InvalidationStatus::Other("Throttled".into()));
        assert_eq!(other.to_string(), "Throttled");
    }

    #[tokio::test]
    async fn test_memory_bucket_head_and_put() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("index.html");
        std::fs::write(&source, b"<h1>hi</h1>").unwrap();

        let bucket = MemoryBucket::new();
        let err = bucket.head_object("site", "index.html").await.unwrap_err();
        assert!(err.is_not_found());

        let mut metadata = BTreeMap::new();
        metadata.insert(DIGEST_METADATA_KEY.to_string(), "abc".to_string());
        bucket
            .put_object(&PutObjectRequest {
                bucket: "site".into(),
                key: "index.html".into(),
                source,
                content_type: Some("text/html".into()),
                acl: "public-read".into(),
                cache_control: "max-age=60".into(),
                metadata,
                headers: Headers::new(),
            })
            .await
            .unwrap();

        let head = bucket.head_object("site", "index.html").await.unwrap();
        assert_eq!(head.stored_digest(), Some("abc"));
        assert_eq!(head.size, 11);
        assert_eq!(bucket.head_count(), 2);
        assert_eq!(bucket.put_attempts("index.html"), 1);
        assert_eq!(
            bucket.get_object("site", "index.html").await.unwrap(),
            Bytes::from_static(b"<h1>hi</h1>")
        );
    }

    #[tokio::test]
    async fn test_memory_bucket_scripted_put_failures() {
        let bucket = MemoryBucket::new();
        bucket.fail_puts("k", 2, RemoteError::status(503, "SlowDown"));

        for _ in 0..2 {
            let err = bucket.put_bytes("b", "k", Bytes::from_static(b"x")).await.unwrap_err();
            assert_eq!(err, RemoteError::status(503, "SlowDown"));
        }
        bucket.put_bytes("b", "k", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(bucket.put_attempts("k"), 3);
        assert_eq!(bucket.keys("b"), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_bucket_head_failure() {
        let bucket = MemoryBucket::new();
        bucket.insert("b", "k", StoredObject::default());
        bucket.fail_heads("k", RemoteError::status(403, "AccessDenied"));
        let err = bucket.head_object("b", "k").await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_cdn_script() {
        let cdn = MemoryCdn::with_statuses([InvalidationStatus::InProgress]);
        let request = InvalidationRequest {
            distribution_id: "E1".into(),
            paths: vec![INVALIDATE_ALL.into()],
            caller_reference: "1".into(),
        };
        let id = cdn.create_invalidation(&request).await.unwrap();
        assert_eq!(id, "I0001");
        assert_eq!(cdn.get_invalidation("E1", &id).await.unwrap(), InvalidationStatus::InProgress);
        assert_eq!(cdn.get_invalidation("E1", &id).await.unwrap(), InvalidationStatus::Completed);
        assert_eq!(cdn.poll_count(), 2);
        assert_eq!(cdn.requests(), vec![request]);
    }
}

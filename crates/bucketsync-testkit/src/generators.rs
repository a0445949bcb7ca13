//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use bucketsync_core::Headers;
use proptest::prelude::*;

/// A relative file path with one to three segments and a web extension.
pub fn relative_path() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,7}(/[a-z][a-z0-9_-]{0,7}){0,2}\\.(html|css|js|json|txt|svg|png)"
        .prop_map(String::from)
}

/// File contents of at most `max_len` bytes.
pub fn file_body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Upload headers with lowercase names.
pub fn headers() -> impl Strategy<Value = Headers> {
    prop::collection::btree_map("x-amz-meta-[a-z]{1,8}", "[a-zA-Z0-9=,-]{1,16}", 0..4)
}

/// Object key prefix, empty or ending in `/`.
pub fn key_prefix() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,6}/".prop_map(String::from)]
}

/// A set of files keyed by relative path.
#[derive(Debug, Clone)]
pub struct SiteSpec {
    pub files: BTreeMap<String, Vec<u8>>,
}

impl SiteSpec {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

/// A site of between one and `max_files` files.
///
/// Directory segments never contain a dot, so no file path can collide with
/// a directory of another.
pub fn site(max_files: usize) -> impl Strategy<Value = SiteSpec> {
    prop::collection::btree_map(relative_path(), file_body(256), 1..=max_files.max(1))
        .prop_map(|files| SiteSpec { files })
}

impl Arbitrary for SiteSpec {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        site(12).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn relative_paths_never_start_with_slash(path in relative_path()) {
            prop_assert!(!path.starts_with('/'));
            prop_assert!(path.contains('.'));
        }

        #[test]
        fn sites_are_non_empty(spec: SiteSpec) {
            prop_assert!(!spec.files.is_empty());
        }

        #[test]
        fn prefixes_end_with_slash(prefix in key_prefix()) {
            prop_assert!(prefix.is_empty() || prefix.ends_with('/'));
        }
    }
}

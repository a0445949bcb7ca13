//! Snapshot codec.
//!
//! A snapshot is the whole cache as newline-delimited JSON, one
//! `{"key": ..., "value": ...}` object per line. It is what gets stored in
//! the bucket so a fresh machine can start with the previous run's cache.

use crate::error::{CacheError, Result};
use crate::traits::CacheEntry;

/// Encode entries as newline-delimited JSON.
///
/// Entries are written in the order given; [`ChangeCache::entries`] already
/// returns them sorted.
///
/// [`ChangeCache::entries`]: crate::ChangeCache::entries
pub fn encode_snapshot(entries: &[CacheEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(entries.len() * 96);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Decode a snapshot produced by [`encode_snapshot`].
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<CacheEntry>> {
    let text = std::str::from_utf8(bytes).map_err(|e| CacheError::Snapshot {
        line: 0,
        message: format!("not utf-8: {e}"),
    })?;

    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: CacheEntry =
            serde_json::from_str(line).map_err(|e| CacheError::Snapshot {
                line: index + 1,
                message: e.to_string(),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let bytes = encode_snapshot(&[
            CacheEntry::new("digest:/a", "00"),
            CacheEntry::new("digest:/b", "11"),
        ])
        .unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "{\"key\":\"digest:/a\",\"value\":\"00\"}\n{\"key\":\"digest:/b\",\"value\":\"11\"}\n"
        );
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let input = b"\n{\"key\":\"k1\",\"value\":\"v1\"}\n\n  \n{\"key\":\"k2\",\"value\":\"v2\"}";
        let entries = decode_snapshot(input).unwrap();
        assert_eq!(
            entries,
            vec![CacheEntry::new("k1", "v1"), CacheEntry::new("k2", "v2")]
        );
    }

    #[test]
    fn test_decode_reports_bad_line() {
        let input = b"{\"key\":\"k1\",\"value\":\"v1\"}\nnot json\n";
        match decode_snapshot(input).unwrap_err() {
            CacheError::Snapshot { line, .. } => assert_eq!(line, 2),
            other => panic!("expected snapshot error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(encode_snapshot(&[]).unwrap().is_empty());
        assert!(decode_snapshot(b"").unwrap().is_empty());
    }

    #[test]
    fn test_values_with_newlines_survive() {
        let entries = vec![CacheEntry::new("weird\nkey", "line1\nline2")];
        let bytes = encode_snapshot(&entries).unwrap();
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(decode_snapshot(&bytes).unwrap(), entries);
    }

    proptest! {
        #[test]
        fn arbitrary_text_survives_the_codec(
            pairs in prop::collection::btree_map(any::<String>(), any::<String>(), 0..16),
        ) {
            let entries: Vec<_> = pairs
                .into_iter()
                .map(|(k, v)| CacheEntry::new(k, v))
                .collect();
            let bytes = encode_snapshot(&entries).unwrap();

            prop_assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), entries.len());
            prop_assert_eq!(decode_snapshot(&bytes).unwrap(), entries);
        }
    }
}

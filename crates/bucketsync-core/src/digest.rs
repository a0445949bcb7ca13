//! Digest computation.
//!
//! A [`FileDigest`] is BLAKE3 over a seed followed by the file's bytes. The
//! seed is the JSON array `[headers, destination_url]`, so the digest changes
//! whenever the bytes, the destination or the upload headers change.
//!
//! Headers are a `BTreeMap`, which serializes its keys in sorted order. Two
//! runs configured with the same headers always produce the same seed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::types::FileDigest;

/// Extra upload headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Buffer size used when streaming a file into the hasher.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Incremental digest over a seeded BLAKE3 hasher.
#[derive(Clone)]
pub struct DigestBuilder {
    hasher: blake3::Hasher,
}

impl DigestBuilder {
    /// Start a digest bound to the given headers and destination URL.
    pub fn new(headers: &Headers, destination_url: &str) -> Result<Self> {
        let seed = serde_json::to_vec(&(headers, destination_url))
            .map_err(|e| CoreError::Encoding(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&seed);
        Ok(Self { hasher })
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Stream a reader to EOF into the digest.
    ///
    /// Returns the number of bytes consumed.
    pub fn update_reader<R: Read>(&mut self, mut reader: R) -> io::Result<u64> {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            match reader.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    self.hasher.update(&buf[..n]);
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Produce the digest. The builder can keep being fed afterwards.
    pub fn finalize(&self) -> FileDigest {
        self.hasher.finalize().into()
    }
}

/// Digest everything a reader yields.
pub fn digest_reader<R: Read>(
    reader: R,
    headers: &Headers,
    destination_url: &str,
) -> Result<FileDigest> {
    let mut builder = DigestBuilder::new(headers, destination_url)?;
    builder.update_reader(reader)?;
    Ok(builder.finalize())
}

/// Digest a file on disk.
///
/// This blocks; async callers should run it on a blocking thread.
pub fn digest_file(path: &Path, headers: &Headers, destination_url: &str) -> Result<FileDigest> {
    let io_err = |source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut builder = DigestBuilder::new(headers, destination_url)?;
    builder.update_reader(file).map_err(io_err)?;
    Ok(builder.finalize())
}

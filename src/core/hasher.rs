//! Content-addressed identity for invoice files
//!
//! An invoice is identified by the SHA-256 digest of its file bytes. The
//! digest is a pure function of the byte sequence: filename, timestamps and
//! other metadata never participate. Two uploads of the same PDF always
//! collide on the same digest, which is what makes the pre-upload
//! deduplication gate possible.
//!
//! [`ContentHasher`] supports one-shot hashing for in-memory buffers and
//! streaming computation for readers, so arbitrarily large sources can be
//! digested chunk by chunk.

use crate::core::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read granularity for streaming digests
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// A SHA-256 digest of an invoice file's bytes, rendered as lowercase hex
///
/// The digest is the primary identity of an invoice everywhere in this crate:
/// cache keys, mutation slots and remote paths are all addressed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// The hex representation of the digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing a string that is not a SHA-256 hex digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDigestError {
    value: String,
}

impl fmt::Display for ParseDigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a 64-character hex SHA-256 digest",
            self.value
        )
    }
}

impl std::error::Error for ParseDigestError {}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Digest(s.to_ascii_lowercase()))
        } else {
            Err(ParseDigestError {
                value: s.to_string(),
            })
        }
    }
}

/// Streaming SHA-256 hasher for invoice file contents
///
/// ```rust,ignore
/// // One-shot
/// let digest = ContentHasher::hash_bytes(&bytes);
///
/// // Streaming
/// let mut hasher = ContentHasher::new();
/// hasher.update(&chunk_a);
/// hasher.update(&chunk_b);
/// let digest = hasher.finalize();
/// ```
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    /// Create an empty hasher
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Feed a chunk of bytes into the digest
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Consume the hasher and produce the digest
    pub fn finalize(self) -> Digest {
        Digest(hex::encode(self.inner.finalize()))
    }

    /// Hash a complete in-memory byte sequence
    pub fn hash_bytes(bytes: &[u8]) -> Digest {
        let mut hasher = Self::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Hash an async reader chunk by chunk
    ///
    /// Fails with [`SyncError::Io`] if the source cannot be read; a partial
    /// digest is never returned.
    pub async fn hash_reader<R>(reader: &mut R) -> SyncResult<Digest>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut hasher = Self::new();
        let mut buf = vec![0u8; HASH_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await.map_err(SyncError::Io)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Hash the contents of a file on disk
    pub async fn hash_file(path: impl AsRef<Path>) -> SyncResult<Digest> {
        let mut file = tokio::fs::File::open(path).await.map_err(SyncError::Io)?;
        Self::hash_reader(&mut file).await
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

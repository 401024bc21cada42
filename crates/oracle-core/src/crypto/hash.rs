//! SHA-256 content hashing.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Prefix used when a content hash is persisted in a signature record.
pub const CONTENT_HASH_PREFIX: &str = "sha256:";

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hasher for document content.
///
/// Produces lowercase hex SHA-256 digests. Any single-byte change in the
/// input changes the output with overwhelming probability.
pub struct ContentHasher;

impl ContentHasher {
    /// Hashes raw bytes, returning a 64-character lowercase hex digest.
    #[must_use]
    pub fn hash(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Reads a file and hashes its bytes.
    ///
    /// Returns the digest together with the number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub fn hash_file(path: &Path) -> std::io::Result<(String, u64)> {
        let bytes = std::fs::read(path)?;
        Ok((Self::hash(&bytes), bytes.len() as u64))
    }

    /// Formats a digest in the prefixed form stored in signature records
    /// (`sha256:<hex>`).
    #[must_use]
    pub fn prefixed(digest: &str) -> String {
        format!("{CONTENT_HASH_PREFIX}{digest}")
    }

    /// Strips the `sha256:` prefix from a stored content hash.
    ///
    /// Returns `None` if the prefix is missing or the remainder is not a
    /// 64-character hex digest.
    #[must_use]
    pub fn strip_prefix(stored: &str) -> Option<&str> {
        let digest = stored.strip_prefix(CONTENT_HASH_PREFIX)?;
        let well_formed =
            digest.len() == DIGEST_HEX_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit());
        well_formed.then_some(digest)
    }
}

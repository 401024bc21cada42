//! Error types for signing and verification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from claim construction, signing, verification, and artifact
/// storage.
///
/// A content change detected during verification is **not** an error: it is
/// reported as a non-valid [`VerificationOutcome`](super::VerificationOutcome).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SigningError {
    /// A document could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file that could not be read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document lies outside the project root.
    #[error("path {path} is outside project root {project_root}")]
    PathOutsideProject {
        /// The offending path.
        path: PathBuf,
        /// The project root it was checked against.
        project_root: PathBuf,
    },

    /// The signature artifact or compact token could not be parsed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// No stored signature exists for a document.
    #[error("no signature found at {path}")]
    SignatureNotFound {
        /// Conventional signature path that was checked.
        path: PathBuf,
    },

    /// A claim set was requested with no documents.
    #[error("a claim set must cover at least one document")]
    EmptyClaimSet,

    /// A single-document signature was requested for several documents.
    #[error("single-document signatures cover exactly one document, got {count}")]
    DocumentCountMismatch {
        /// Number of documents supplied.
        count: usize,
    },

    /// The validity duration is zero or negative.
    #[error("validity duration must be positive, got {seconds}s")]
    InvalidValidity {
        /// Requested validity in seconds.
        seconds: i64,
    },

    /// The shared secret is too short.
    #[error("signing secret must be at least {min_length} bytes")]
    SecretTooShort {
        /// Minimum required length.
        min_length: usize,
    },

    /// The MAC could not be keyed.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Canonical or artifact serialization failed.
    #[error("serialization failed: {0}")]
    Canonicalization(String),
}

impl SigningError {
    /// Wraps an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Signature verification.
//!
//! A verification result depends only on the live file bytes, the signature
//! value, and the key passed in. Signer metadata is read from the signature
//! itself. Wall-clock time is not consulted; see
//! [`ExpirationPolicy`](super::ExpirationPolicy) for the orthogonal
//! expiration query.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use super::path::{normalize_path, resolve_claim_path};
use super::{SignatureFormat, SigningError};
use crate::crypto::{ContentHasher, SigningKey};

/// Result of a verification that ran to completion.
///
/// Only [`VerificationOutcome::Valid`] is a pass. Every other variant is a
/// finding, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// MAC and every covered document match.
    Valid,
    /// The MAC does not match the embedded claims under this key.
    MacMismatch,
    /// A covered document changed since signing.
    ContentMismatch {
        /// Project-relative path of the changed document.
        path: String,
        /// Digest recorded at signing time.
        expected: String,
        /// Digest of the live file.
        actual: String,
    },
    /// The requested document is not covered by the signature.
    NotCovered {
        /// Project-relative path of the requested document.
        path: String,
    },
}

impl VerificationOutcome {
    /// Returns `true` only for [`VerificationOutcome::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Verifies signatures against the files under one project root.
#[derive(Debug, Clone)]
pub struct Verifier {
    project_root: PathBuf,
}

impl Verifier {
    /// Creates a verifier rooted at `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Verifies the MAC and every document the signature covers.
    ///
    /// The MAC is checked first; a mismatch short-circuits before any file
    /// is read.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the signature is
    /// structurally invalid, or [`SigningError::Io`] if a covered document
    /// cannot be read.
    #[instrument(skip_all, fields(signature_id = %signature.signature_id()))]
    pub fn verify(
        &self,
        signature: &SignatureFormat,
        key: &SigningKey,
    ) -> Result<VerificationOutcome, SigningError> {
        let mac_ok = match signature {
            SignatureFormat::SingleDocument(record) => record.verify_mac(key)?,
            SignatureFormat::ClaimBundle(bundle) => bundle.verify_mac(key)?,
        };
        if !mac_ok {
            warn!("signature MAC does not match embedded claims");
            return Ok(VerificationOutcome::MacMismatch);
        }

        for (path, expected) in covered_digests(signature)? {
            let live = resolve_claim_path(&self.project_root, path);
            let (actual, _) =
                ContentHasher::hash_file(&live).map_err(|err| SigningError::io(&live, err))?;
            if actual != expected {
                warn!(path, "document content changed since signing");
                return Ok(VerificationOutcome::ContentMismatch {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            debug!(path, "document content matches");
        }

        Ok(VerificationOutcome::Valid)
    }

    /// Verifies `signature` and additionally requires `document` to be one
    /// of the documents it covers.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::PathOutsideProject`] if `document` is not under
    /// the project root, plus any error of [`Self::verify`].
    pub fn verify_document(
        &self,
        document: &Path,
        signature: &SignatureFormat,
        key: &SigningKey,
    ) -> Result<VerificationOutcome, SigningError> {
        let relative = normalize_path(document, &self.project_root)?;
        if !signature.document_paths().contains(&relative.as_str()) {
            warn!(path = %relative, "document is not covered by signature");
            return Ok(VerificationOutcome::NotCovered { path: relative });
        }
        self.verify(signature, key)
    }

    /// Plain boolean form: `Ok(true)` only if every file in `files` is
    /// covered and the signature verifies.
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify_document`].
    pub fn verify_files<P: AsRef<Path>>(
        &self,
        files: &[P],
        signature: &SignatureFormat,
        key: &SigningKey,
    ) -> Result<bool, SigningError> {
        let covered = signature.document_paths();
        for file in files {
            let relative = normalize_path(file.as_ref(), &self.project_root)?;
            if !covered.contains(&relative.as_str()) {
                warn!(path = %relative, "document is not covered by signature");
                return Ok(false);
            }
        }
        Ok(self.verify(signature, key)?.is_valid())
    }
}

/// Returns `(path, hex digest)` for every claim in the signature.
fn covered_digests(signature: &SignatureFormat) -> Result<Vec<(&str, &str)>, SigningError> {
    match signature {
        SignatureFormat::SingleDocument(record) => {
            let digest = record.content_digest().ok_or_else(|| {
                SigningError::MalformedSignature("content_hash is not a sha256: digest".into())
            })?;
            Ok(vec![(record.specification_path.as_str(), digest)])
        },
        SignatureFormat::ClaimBundle(bundle) => Ok(bundle
            .claims()
            .documents
            .iter()
            .map(|doc| (doc.path.as_str(), doc.content_hash.as_str()))
            .collect()),
    }
}

//! Signature generation for both formats.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use super::record::signature_id;
use super::{
    ClaimBuilder, CompactSignature, ExpirationPolicy, FormatKind, SignatureFormat,
    SignatureRecord, SignerInfo, SigningError, SpecificationContext,
};
use crate::ORACLE_VERSION;
use crate::crypto::{ContentHasher, MAC_ALGORITHM, SigningKey};

/// Produces signatures for documents under one project root.
#[derive(Debug, Clone)]
pub struct Signer {
    claims: ClaimBuilder,
}

impl Signer {
    /// Creates a signer with the default validity window.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            claims: ClaimBuilder::new(project_root),
        }
    }

    /// Overrides the validity window of produced signatures.
    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.claims = self.claims.with_validity(validity);
        self
    }

    /// Returns the project root.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        self.claims.project_root()
    }

    /// Signs `documents` in the requested shape.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::DocumentCountMismatch`] if a single-document
    /// signature is requested for more than one document, plus any error of
    /// [`Self::sign_document`] or [`Self::sign_bundle`].
    pub fn sign<P: AsRef<Path>>(
        &self,
        kind: FormatKind,
        documents: &[P],
        signer: &SignerInfo,
        context: &SpecificationContext,
        key: &SigningKey,
        now: DateTime<Utc>,
    ) -> Result<SignatureFormat, SigningError> {
        match kind {
            FormatKind::SingleDocument => match documents {
                [] => Err(SigningError::EmptyClaimSet),
                [document] => self
                    .sign_document(document.as_ref(), signer, context, key, now)
                    .map(SignatureFormat::SingleDocument),
                _ => Err(SigningError::DocumentCountMismatch {
                    count: documents.len(),
                }),
            },
            FormatKind::ClaimBundle => self
                .sign_bundle(documents, signer, key, now)
                .map(SignatureFormat::ClaimBundle),
        }
    }

    /// Produces a single-document signature record.
    ///
    /// # Errors
    ///
    /// Returns any claim-building, canonicalization, or keying error.
    #[instrument(skip(self, signer, context, key), fields(signer = %signer.email))]
    pub fn sign_document(
        &self,
        document: &Path,
        signer: &SignerInfo,
        context: &SpecificationContext,
        key: &SigningKey,
        now: DateTime<Utc>,
    ) -> Result<SignatureRecord, SigningError> {
        let claims = self.claims.build_claim_set(&[document], signer, now)?;
        let valid_from = claims.issued_at_utc();
        let expires_at = claims.expires_at_utc();
        let Some(claim) = claims.documents.into_iter().next() else {
            return Err(SigningError::EmptyClaimSet);
        };

        let mut record = SignatureRecord {
            signature_id: signature_id(valid_from, &claim.path),
            specification_path: claim.path,
            algorithm: MAC_ALGORITHM.to_string(),
            signature_value: String::new(),
            content_hash: ContentHasher::prefixed(&claim.content_hash),
            key_identifier: key.key_identifier().to_string(),
            signer: signer.clone(),
            signing_timestamp: valid_from,
            valid_from,
            expires_at,
            status: ExpirationPolicy::default().classify(expires_at, valid_from),
            specification_version: context.version.clone(),
            specification_status_at_signing: context.status_at_signing.clone(),
            related_approvals: context.related_approvals.clone(),
            oracle_version: ORACLE_VERSION.to_string(),
        };
        record.seal(key)?;

        info!(
            signature_id = %record.signature_id,
            path = %record.specification_path,
            "signed document"
        );
        Ok(record)
    }

    /// Produces a claim-bundle signature over one or more documents.
    ///
    /// # Errors
    ///
    /// Returns any claim-building, canonicalization, or keying error.
    #[instrument(skip_all, fields(documents = documents.len(), signer = %signer.email))]
    pub fn sign_bundle<P: AsRef<Path>>(
        &self,
        documents: &[P],
        signer: &SignerInfo,
        key: &SigningKey,
        now: DateTime<Utc>,
    ) -> Result<CompactSignature, SigningError> {
        let claims = self.claims.build_claim_set(documents, signer, now)?;
        let bundle = CompactSignature::encode(claims, key)?;
        info!(documents = documents.len(), "signed claim bundle");
        Ok(bundle)
    }
}

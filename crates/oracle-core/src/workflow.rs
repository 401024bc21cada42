//! End-to-end sign-and-anchor and verify operations.
//!
//! ```text
//! sign:   ClaimBuilder -> Signer -> SignatureStore::save -> ProvenanceAnchor::commit
//!                                                         -> ProvenanceAnchor::current_commit_hash
//! verify: SignatureStore::load -> Verifier::verify_document
//!                              -> ExpirationPolicy::classify_signature
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::ConfigError;
use crate::crypto::{MAC_ALGORITHM, SigningKey};
use crate::provenance::{CommitHash, ProvenanceAnchor, ProvenanceError};
use crate::signing::{
    ArtifactSnapshot, DEFAULT_VALIDITY_DAYS, ExpirationPolicy, FormatKind, SignatureFormat,
    SignatureStatus, SignatureStore, Signer, SignerInfo, SigningError, SpecificationContext,
    VerificationOutcome, Verifier,
};

/// Errors from the end-to-end workflows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    /// Signing, verification, or storage failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Committing or confirming the artifact failed.
    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Inputs of [`sign_and_anchor`].
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// Project root documents are claimed against.
    pub project_root: PathBuf,
    /// Documents to sign.
    pub documents: Vec<PathBuf>,
    /// Signature shape.
    pub format: FormatKind,
    /// Signer metadata, resolved by the caller.
    pub signer: SignerInfo,
    /// Specification metadata for single-document records.
    pub context: SpecificationContext,
    /// Validity window.
    pub validity: Duration,
    /// Optional paragraph added to the commit message.
    pub message: Option<String>,
}

impl SignRequest {
    /// Creates a single-document request with default validity and context.
    #[must_use]
    pub fn new(
        project_root: impl Into<PathBuf>,
        documents: Vec<PathBuf>,
        signer: SignerInfo,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            documents,
            format: FormatKind::default(),
            signer,
            context: SpecificationContext::default(),
            validity: Duration::days(i64::from(DEFAULT_VALIDITY_DAYS)),
            message: None,
        }
    }
}

/// Result of [`sign_and_anchor`].
#[derive(Debug, Clone, Serialize)]
pub struct SignOutcome {
    /// Identifier of the new signature.
    pub signature_id: String,
    /// Shape of the new signature.
    pub format: FormatKind,
    /// Artifact files written.
    pub artifact_paths: Vec<PathBuf>,
    /// Provenance commit, absent when anchoring was skipped.
    pub commit: Option<CommitHash>,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
}

/// Signs the requested documents, stores the artifact, and optionally
/// commits it.
///
/// With `anchor = None` the artifact is written but not committed. With an
/// anchor, [`ProvenanceAnchor::ensure_ready`] runs before anything is
/// written, and if the commit fails every artifact is restored to what was
/// on disk before the call.
///
/// # Errors
///
/// Returns [`WorkflowError::Signing`] if claims cannot be built or the
/// artifact cannot be written, and [`WorkflowError::Provenance`] if the
/// anchor is not ready, the commit fails, or HEAD does not match the new
/// commit afterwards.
#[instrument(skip_all, fields(documents = request.documents.len(), format = %request.format))]
pub fn sign_and_anchor(
    request: &SignRequest,
    key: &SigningKey,
    anchor: Option<&dyn ProvenanceAnchor>,
    now: DateTime<Utc>,
) -> Result<SignOutcome, WorkflowError> {
    let signature = Signer::new(&request.project_root)
        .with_validity(request.validity)
        .sign(
            request.format,
            &request.documents,
            &request.signer,
            &request.context,
            key,
            now,
        )?;
    if let Some(anchor) = anchor {
        anchor.ensure_ready()?;
    }

    let store = SignatureStore::new(&request.project_root);
    let snapshot = store.snapshot(&signature)?;
    let artifact_paths = match store.save(&signature) {
        Ok(paths) => paths,
        Err(err) => {
            restore_artifacts(&snapshot);
            return Err(err.into());
        },
    };

    let commit = match anchor {
        Some(anchor) => {
            let message = commit_message(&signature, request.message.as_deref());
            let committed = match anchor.commit(&artifact_paths, &message) {
                Ok(committed) => committed,
                Err(err) => {
                    restore_artifacts(&snapshot);
                    return Err(err.into());
                },
            };
            let head = anchor.current_commit_hash()?;
            if head != committed {
                return Err(ProvenanceError::CommitNotConfirmed { committed, head }.into());
            }
            Some(committed)
        },
        None => None,
    };

    let outcome = SignOutcome {
        signature_id: signature.signature_id(),
        format: signature.kind(),
        artifact_paths,
        commit,
        expires_at: signature.expires_at(),
    };
    info!(
        signature_id = %outcome.signature_id,
        commit = outcome.commit.as_ref().map_or("-", CommitHash::as_str),
        "signature created"
    );
    Ok(outcome)
}

fn restore_artifacts(snapshot: &ArtifactSnapshot) {
    match snapshot.restore() {
        Ok(()) => debug!("restored signature artifacts after failed anchoring"),
        Err(err) => warn!(error = %err, "failed to restore signature artifacts"),
    }
}

/// Builds the provenance commit message for `signature`.
///
/// ```text
/// docs: digitally sign auth.md
///
/// <custom paragraph>
///
/// Signature details:
/// - Signature ID: sig_20260101120000_auth
/// - Signer: alice@example.com (architect)
/// - Reason: Approved
/// - Algorithm: HMAC-SHA256
/// - Valid until: 2026-04-01
/// ```
#[must_use]
pub fn commit_message(signature: &SignatureFormat, custom: Option<&str>) -> String {
    let names: Vec<&str> = signature
        .document_paths()
        .into_iter()
        .map(|path| path.rsplit('/').next().unwrap_or(path))
        .collect();
    let signer = signature.signer();

    let mut message = format!("docs: digitally sign {}\n", names.join(", "));
    if let Some(custom) = custom.map(str::trim).filter(|c| !c.is_empty()) {
        let _ = write!(message, "\n{custom}\n");
    }
    let _ = write!(
        message,
        "\nSignature details:\n\
         - Signature ID: {}\n\
         - Signer: {} ({})\n\
         - Reason: {}\n\
         - Algorithm: {MAC_ALGORITHM}\n\
         - Valid until: {}\n",
        signature.signature_id(),
        signer.email,
        signer.role,
        signer.signing_reason,
        signature.expires_at().format("%Y-%m-%d"),
    );
    message
}

/// Result of [`verify_document`].
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Tamper result.
    pub outcome: VerificationOutcome,
    /// Expiration status at the time of the query.
    pub status: SignatureStatus,
    /// Identifier of the verified signature.
    pub signature_id: String,
    /// Shape of the verified signature.
    pub format: FormatKind,
    /// Signer recorded in the signature.
    pub signer: SignerInfo,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
}

impl VerificationReport {
    /// Returns `true` if the content and MAC verified, regardless of
    /// expiration.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }
}

/// Loads the stored signature of `document`, verifies it, and classifies its
/// expiration.
///
/// # Errors
///
/// Returns [`WorkflowError::Signing`] if the artifact is missing or
/// malformed or a covered document cannot be read. A content change is a
/// non-valid [`VerificationOutcome`], not an error.
#[instrument(skip(key, policy))]
pub fn verify_document(
    project_root: &Path,
    document: &Path,
    key: &SigningKey,
    policy: &ExpirationPolicy,
    now: DateTime<Utc>,
) -> Result<VerificationReport, WorkflowError> {
    let signature = SignatureStore::new(project_root).load(document)?;
    let outcome = Verifier::new(project_root).verify_document(document, &signature, key)?;
    let status = policy.classify_signature(&signature, now);
    if outcome.is_valid() && status == SignatureStatus::Expired {
        warn!(document = %document.display(), "signature is valid but expired");
    }

    Ok(VerificationReport {
        outcome,
        status,
        signature_id: signature.signature_id(),
        format: signature.kind(),
        signer: signature.signer(),
        expires_at: signature.expires_at(),
    })
}

//! Deterministic exit codes.
//!
//! # Exit Code Categories
//!
//! - **0**: Success, signature valid
//! - **1**: Generic error
//! - **2-3**: Verification findings (invalid, expired)
//! - **10-19**: Validation, configuration, and lookup errors
//! - **20-29**: Version control and artifact decoding errors

use oracle_core::{ProvenanceError, SigningError, WorkflowError};

/// Exit code constants.
pub mod codes {
    /// Success, or a valid and unexpired signature.
    pub const SUCCESS: u8 = 0;

    /// Generic error (fallback for unmapped errors).
    pub const GENERIC_ERROR: u8 = 1;

    /// The signature does not match the document or the key.
    pub const SIGNATURE_INVALID: u8 = 2;

    /// The signature is valid but past its expiry.
    pub const SIGNATURE_EXPIRED: u8 = 3;

    /// Invalid arguments, configuration, or key material.
    pub const VALIDATION_ERROR: u8 = 10;

    /// No signature artifact exists for the document.
    pub const NOT_FOUND: u8 = 12;

    /// Git is missing, the tree is not a repository, or a commit failed.
    pub const VCS_ERROR: u8 = 20;

    /// The signature artifact could not be decoded.
    pub const MALFORMED_SIGNATURE: u8 = 21;
}

/// Maps a signing error to an exit code.
pub fn for_signing_error(error: &SigningError) -> u8 {
    match error {
        SigningError::SignatureNotFound { .. } => codes::NOT_FOUND,
        SigningError::MalformedSignature(_) => codes::MALFORMED_SIGNATURE,
        SigningError::PathOutsideProject { .. }
        | SigningError::EmptyClaimSet
        | SigningError::DocumentCountMismatch { .. }
        | SigningError::InvalidValidity { .. }
        | SigningError::SecretTooShort { .. }
        | SigningError::InvalidKey(_) => codes::VALIDATION_ERROR,
        _ => codes::GENERIC_ERROR,
    }
}

/// Maps a workflow error to an exit code.
pub fn for_workflow_error(error: &WorkflowError) -> u8 {
    match error {
        WorkflowError::Signing(err) => for_signing_error(err),
        WorkflowError::Provenance(ProvenanceError::InvalidCommitHash(_)) => codes::GENERIC_ERROR,
        WorkflowError::Provenance(_) => codes::VCS_ERROR,
        WorkflowError::Config(_) => codes::VALIDATION_ERROR,
        _ => codes::GENERIC_ERROR,
    }
}

/// Returns a short machine-readable label for an exit code.
pub const fn exit_code_label(code: u8) -> &'static str {
    match code {
        codes::SUCCESS => "ok",
        codes::SIGNATURE_INVALID => "signature_invalid",
        codes::SIGNATURE_EXPIRED => "signature_expired",
        codes::VALIDATION_ERROR => "validation_error",
        codes::NOT_FOUND => "not_found",
        codes::VCS_ERROR => "vcs_error",
        codes::MALFORMED_SIGNATURE => "malformed_signature",
        _ => "error",
    }
}

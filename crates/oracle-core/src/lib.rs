//! # oracle-core
//!
//! Document integrity layer for specification management.
//!
//! This crate produces tamper-evident, time-bounded attestations
//! ("signatures") over specification documents and later re-verifies that
//! the documents have not changed since a signer attested to them.
//!
//! ## Components
//!
//! - [`crypto`]: SHA-256 content hashing and the HMAC-SHA256 [`SigningKey`]
//! - [`signing`]: path normalization, claims, the [`Signer`], the
//!   [`Verifier`], expiration classification, and the on-disk
//!   [`SignatureStore`]
//! - [`provenance`]: the [`ProvenanceAnchor`] seam and its git implementation
//! - [`config`]: TOML configuration for validity windows and key labels
//! - [`workflow`]: the end-to-end sign-and-anchor and verify operations
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use oracle_core::{
//!     ExpirationPolicy, FormatKind, SignerInfo, Signer, SigningKey, SpecificationContext,
//!     Verifier,
//! };
//! use secrecy::SecretString;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = SigningKey::new(
//!     "oracle-default",
//!     SecretString::from("test-secret-key-for-hmac-signing"),
//! )?;
//! let signer_info = SignerInfo::new("alice@example.com", "architect", "Approved");
//!
//! let signer = Signer::new("/repo");
//! let signature = signer.sign(
//!     FormatKind::SingleDocument,
//!     &["/repo/docs/specs/auth.md"],
//!     &signer_info,
//!     &SpecificationContext::default(),
//!     &key,
//!     Utc::now(),
//! )?;
//!
//! let outcome = Verifier::new("/repo").verify(&signature, &key)?;
//! assert!(outcome.is_valid());
//!
//! let status = ExpirationPolicy::default().classify_signature(&signature, Utc::now());
//! println!("signature status: {status}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! Verification depends only on the live file bytes, the signature value,
//! and the caller-supplied key. The signer identity is carried inside the
//! signed claims; nothing in this crate reads environment variables or git
//! configuration to decide a verification result.

pub mod config;
pub mod crypto;
pub mod provenance;
pub mod signing;
pub mod workflow;

pub use config::{ConfigError, OracleConfig, SignerDefaults, SigningSection};
pub use crypto::{ContentHasher, SigningKey};
pub use provenance::{CommitHash, GitCliAnchor, ProvenanceAnchor, ProvenanceError};
pub use signing::{
    ClaimBuilder, CompactSignature, DocumentClaim, ExpirationPolicy, FormatKind, MAX_VALIDITY_DAYS,
    SignatureClaims, SignatureFormat, SignatureRecord, SignatureStatus, SignatureStore, Signer,
    SignerInfo, SigningError, SpecificationContext, VerificationOutcome, Verifier, normalize_path,
    signature_file_path,
};
pub use workflow::{
    SignOutcome, SignRequest, VerificationReport, WorkflowError, commit_message, sign_and_anchor,
    verify_document,
};

/// Version of the tool that produced a signature artifact.
pub const ORACLE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Issuer recorded in every claim-bundle signature.
pub const ISSUER: &str = "oracle-cli";

//! Claims, signing, verification, expiration, and artifact storage.
//!
//! Two signature shapes share one MAC discipline (JCS canonical bytes keyed
//! with HMAC-SHA256):
//!
//! - [`SignatureRecord`]: one document, persisted field by field.
//! - [`CompactSignature`]: a claim bundle over one or more documents in
//!   `header.claims.signature` form.
//!
//! [`SignatureFormat`] is the tagged union of the two, and [`Signer`] and
//! [`Verifier`] dispatch on it.

mod canonical;
mod claims;
mod compact;
mod error;
mod expiration;
mod format;
mod path;
mod record;
mod signer;
mod store;
mod verifier;

pub use canonical::canonical_json;
pub use claims::{
    CLAIM_SUBJECT, ClaimBuilder, DEFAULT_VALIDITY_DAYS, DocumentClaim, MAX_VALIDITY_DAYS,
    SignatureClaims, SignerInfo,
};
pub use compact::{COMPACT_ALGORITHM, COMPACT_TYPE, CompactSignature};
pub use error::SigningError;
pub use expiration::{DEFAULT_WARN_WINDOW_DAYS, ExpirationPolicy, SignatureStatus};
pub use format::{FormatKind, SignatureFormat};
pub use path::{normalize_path, resolve_claim_path};
pub use record::{SignatureRecord, SpecificationContext, signature_id};
pub use signer::Signer;
pub use store::{
    ArtifactSnapshot, SIGNATURE_DIR, SIGNATURE_EXTENSION, SignatureStore, signature_file_path,
};
pub use verifier::{VerificationOutcome, Verifier};

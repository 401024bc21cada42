//! Document claims and claim sets.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SigningError;
use super::path::normalize_path;
use crate::crypto::{ContentHasher, DIGEST_HEX_LEN};
use crate::{ISSUER, ORACLE_VERSION};

/// Subject recorded in every claim set.
pub const CLAIM_SUBJECT: &str = "document-signing";

/// Default validity window for new signatures.
pub const DEFAULT_VALIDITY_DAYS: u32 = 90;

/// Longest validity window a signature may carry.
pub const MAX_VALIDITY_DAYS: u32 = 36_500;

/// An assertion about one document's identity and content at signing time.
///
/// `content_hash` is the hex SHA-256 of the file bytes when the claim was
/// built. It is never recomputed in place; verification compares it against
/// a fresh digest of the live file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentClaim {
    /// Project-relative, forward-slash path.
    pub path: String,
    /// Hex SHA-256 of the file bytes.
    pub content_hash: String,
    /// File size in bytes.
    pub size: u64,
}

/// Who signed, in what capacity, and why.
///
/// Carried inside every signature value and never looked up again at
/// verification time. Serialized with `signer_`-prefixed keys so it can be
/// flattened into a persisted signature record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Signer email address.
    #[serde(rename = "signer_email")]
    pub email: String,
    /// Signer role (for example `architect`).
    #[serde(rename = "signer_role")]
    pub role: String,
    /// Free-form reason for the signature.
    pub signing_reason: String,
}

impl SignerInfo {
    /// Creates signer metadata.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        role: impl Into<String>,
        signing_reason: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            role: role.into(),
            signing_reason: signing_reason.into(),
        }
    }
}

/// The claim set of a claim-bundle signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureClaims {
    /// Always [`ISSUER`].
    pub issuer: String,
    /// Always [`CLAIM_SUBJECT`].
    pub subject: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds, strictly after `issued_at`.
    pub expires_at: i64,
    /// One claim per covered document, never empty.
    pub documents: Vec<DocumentClaim>,
    /// Signer email.
    pub signer_email: String,
    /// Signer role.
    pub signer_role: String,
    /// Signing reason.
    pub signing_reason: String,
    /// Project root the claims were built against.
    pub project_root: String,
    /// Tool version that built the claims.
    pub version: String,
}

impl SignatureClaims {
    /// Returns the signer metadata embedded in these claims.
    #[must_use]
    pub fn signer(&self) -> SignerInfo {
        SignerInfo::new(&self.signer_email, &self.signer_role, &self.signing_reason)
    }

    /// Returns `issued_at` as a UTC timestamp.
    #[must_use]
    pub fn issued_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.issued_at, 0).unwrap_or_default()
    }

    /// Returns `expires_at` as a UTC timestamp.
    #[must_use]
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// Checks the structural invariants of a claim set.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if `documents` is empty,
    /// `expires_at <= issued_at`, or a document claim is not a normalized
    /// project-relative path with a hex SHA-256 digest.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.documents.is_empty() {
            return Err(SigningError::MalformedSignature(
                "claim set covers no documents".into(),
            ));
        }
        if self.expires_at <= self.issued_at {
            return Err(SigningError::MalformedSignature(format!(
                "expiresAt ({}) must be after issuedAt ({})",
                self.expires_at, self.issued_at
            )));
        }
        for claim in &self.documents {
            validate_claim_path(&claim.path)?;
            if !is_hex_digest(&claim.content_hash) {
                return Err(SigningError::MalformedSignature(format!(
                    "content hash for {} is not a SHA-256 hex digest",
                    claim.path
                )));
            }
        }
        Ok(())
    }
}

/// Builds document claims and claim sets under one project root.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    project_root: PathBuf,
    validity: Duration,
}

impl ClaimBuilder {
    /// Creates a builder with the default 90 day validity window.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            validity: Duration::days(i64::from(DEFAULT_VALIDITY_DAYS)),
        }
    }

    /// Overrides the validity window.
    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Returns the project root.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Returns the validity window.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }

    /// Reads `path` and builds its claim.
    ///
    /// Relative paths are interpreted relative to the project root.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::PathOutsideProject`] if the document is not
    /// under the project root, or [`SigningError::Io`] if it cannot be read.
    pub fn build_document_claim(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<DocumentClaim, SigningError> {
        let path = path.as_ref();
        let relative = normalize_path(path, &self.project_root)?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        let (content_hash, size) =
            ContentHasher::hash_file(&absolute).map_err(|err| SigningError::io(&absolute, err))?;
        debug!(path = %relative, size, "built document claim");

        Ok(DocumentClaim {
            path: relative,
            content_hash,
            size,
        })
    }

    /// Builds a claim set covering every path in `paths`.
    ///
    /// `issued_at` is `now` truncated to whole seconds and `expires_at` is
    /// `issued_at` plus the validity window. If any document cannot be
    /// claimed, no claim set is produced.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::EmptyClaimSet`] if `paths` is empty,
    /// [`SigningError::InvalidValidity`] if the window is not positive or
    /// exceeds [`MAX_VALIDITY_DAYS`], and any error from
    /// [`Self::build_document_claim`].
    pub fn build_claim_set<P: AsRef<Path>>(
        &self,
        paths: &[P],
        signer: &SignerInfo,
        now: DateTime<Utc>,
    ) -> Result<SignatureClaims, SigningError> {
        if paths.is_empty() {
            return Err(SigningError::EmptyClaimSet);
        }
        let invalid_validity = || SigningError::InvalidValidity {
            seconds: self.validity.num_seconds(),
        };
        if self.validity <= Duration::zero()
            || self.validity > Duration::days(i64::from(MAX_VALIDITY_DAYS))
        {
            return Err(invalid_validity());
        }

        let documents = paths
            .iter()
            .map(|path| self.build_document_claim(path))
            .collect::<Result<Vec<_>, _>>()?;

        let issued_at = truncate_to_seconds(now);
        let expires_at = issued_at
            .checked_add_signed(self.validity)
            .ok_or_else(invalid_validity)?;

        Ok(SignatureClaims {
            issuer: ISSUER.to_string(),
            subject: CLAIM_SUBJECT.to_string(),
            issued_at: issued_at.timestamp(),
            expires_at: expires_at.timestamp(),
            documents,
            signer_email: signer.email.clone(),
            signer_role: signer.role.clone(),
            signing_reason: signer.signing_reason.clone(),
            project_root: self.project_root.to_string_lossy().replace('\\', "/"),
            version: ORACLE_VERSION.to_string(),
        })
    }
}

/// Drops sub-second precision so timestamps survive every encoding.
pub(crate) fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.with_nanosecond(0).unwrap_or(instant)
}

pub(crate) fn is_hex_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Rejects claim paths that could resolve outside the project root.
pub(crate) fn validate_claim_path(path: &str) -> Result<(), SigningError> {
    let escapes = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.contains(':')
        || path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes {
        return Err(SigningError::MalformedSignature(format!(
            "claim path {path:?} is not a normalized project-relative path"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn signer() -> SignerInfo {
        SignerInfo::new("test@example.com", "developer", "Testing")
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00.750Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_build_document_claim() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("spec.md"), b"abc").unwrap();

        let claim = ClaimBuilder::new(dir.path())
            .build_document_claim(docs.join("spec.md"))
            .unwrap();

        assert_eq!(claim.path, "docs/spec.md");
        assert_eq!(
            claim.content_hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(claim.size, 3);
    }

    #[test]
    fn test_build_document_claim_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClaimBuilder::new(dir.path()).build_document_claim(dir.path().join("nope.md"));
        assert!(matches!(result, Err(SigningError::Io { .. })));
    }

    #[test]
    fn test_build_claim_set_stamps_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), b"a").unwrap();

        let claims = ClaimBuilder::new(dir.path())
            .build_claim_set(&[dir.path().join("a.md")], &signer(), fixed_now())
            .unwrap();

        assert_eq!(claims.issuer, ISSUER);
        assert_eq!(claims.subject, CLAIM_SUBJECT);
        assert_eq!(claims.issued_at, truncate_to_seconds(fixed_now()).timestamp());
        assert_eq!(claims.expires_at - claims.issued_at, 90 * 24 * 60 * 60);
        assert_eq!(claims.signer(), signer());
        claims.validate().unwrap();
    }

    #[test]
    fn test_build_claim_set_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), b"a").unwrap();

        let result = ClaimBuilder::new(dir.path()).build_claim_set(
            &[dir.path().join("a.md"), dir.path().join("missing.md")],
            &signer(),
            fixed_now(),
        );
        assert!(matches!(result, Err(SigningError::Io { .. })));
    }

    #[test]
    fn test_build_claim_set_rejects_empty() {
        let paths: [&Path; 0] = [];
        let result = ClaimBuilder::new("/root").build_claim_set(&paths, &signer(), fixed_now());
        assert!(matches!(result, Err(SigningError::EmptyClaimSet)));
    }

    #[test]
    fn test_build_claim_set_rejects_non_positive_validity() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), b"a").unwrap();

        let result = ClaimBuilder::new(dir.path())
            .with_validity(Duration::zero())
            .build_claim_set(&[dir.path().join("a.md")], &signer(), fixed_now());
        assert!(matches!(result, Err(SigningError::InvalidValidity { seconds: 0 })));
    }

    #[test]
    fn test_build_claim_set_rejects_oversized_validity() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), b"a").unwrap();
        let paths = [dir.path().join("a.md")];

        let result = ClaimBuilder::new(dir.path())
            .with_validity(Duration::days(i64::from(u32::MAX)))
            .build_claim_set(&paths, &signer(), fixed_now());
        assert!(matches!(result, Err(SigningError::InvalidValidity { .. })));

        let result = ClaimBuilder::new(dir.path())
            .with_validity(Duration::days(i64::from(MAX_VALIDITY_DAYS) + 1))
            .build_claim_set(&paths, &signer(), fixed_now());
        assert!(matches!(result, Err(SigningError::InvalidValidity { .. })));

        let claims = ClaimBuilder::new(dir.path())
            .with_validity(Duration::days(i64::from(MAX_VALIDITY_DAYS)))
            .build_claim_set(&paths, &signer(), fixed_now())
            .unwrap();
        assert_eq!(
            claims.expires_at - claims.issued_at,
            i64::from(MAX_VALIDITY_DAYS) * 86_400
        );
    }

    #[test]
    fn test_validate_rejects_escaping_claim_path() {
        let claims = SignatureClaims {
            issuer: ISSUER.into(),
            subject: CLAIM_SUBJECT.into(),
            issued_at: 10,
            expires_at: 20,
            documents: vec![DocumentClaim {
                path: "../etc/passwd".into(),
                content_hash: "0".repeat(64),
                size: 1,
            }],
            signer_email: "a@example.com".into(),
            signer_role: "r".into(),
            signing_reason: "x".into(),
            project_root: "/root".into(),
            version: ORACLE_VERSION.into(),
        };
        assert!(matches!(claims.validate(), Err(SigningError::MalformedSignature(_))));
    }

    #[test]
    fn test_signer_info_serializes_with_prefixed_keys() {
        let json = serde_json::to_value(signer()).unwrap();
        assert_eq!(json["signer_email"], "test@example.com");
        assert_eq!(json["signer_role"], "developer");
        assert_eq!(json["signing_reason"], "Testing");
    }
}

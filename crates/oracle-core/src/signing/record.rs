//! Single-document signature records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::canonical::canonical_json;
use super::claims::validate_claim_path;
use super::{SignatureStatus, SignerInfo, SigningError};
use crate::crypto::{ContentHasher, MAC_ALGORITHM, SigningKey};

/// Specification metadata recorded alongside a single-document signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationContext {
    /// Version of the specification at signing time.
    pub version: String,
    /// Lifecycle status of the specification at signing time.
    pub status_at_signing: String,
    /// Identifiers of related approvals.
    pub related_approvals: Vec<String>,
}

impl Default for SpecificationContext {
    fn default() -> Self {
        Self {
            version: "unversioned".to_string(),
            status_at_signing: "unknown".to_string(),
            related_approvals: Vec::new(),
        }
    }
}

/// The persisted single-document signature.
///
/// The MAC in `signature_value` covers every other field except `status`,
/// which is a snapshot taken at signing time and must be re-derived with an
/// [`ExpirationPolicy`](super::ExpirationPolicy) whenever it matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// `sig_<timestamp>_<slug>`.
    pub signature_id: String,
    /// Project-relative, forward-slash path of the signed document.
    pub specification_path: String,
    /// Always `HMAC-SHA256`.
    pub algorithm: String,
    /// Hex-encoded MAC.
    pub signature_value: String,
    /// `sha256:<hex>` digest of the document at signing time.
    pub content_hash: String,
    /// Label of the secret used, never the secret itself.
    pub key_identifier: String,
    /// Embedded signer metadata.
    #[serde(flatten)]
    pub signer: SignerInfo,
    /// When the signature was produced.
    pub signing_timestamp: DateTime<Utc>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
    /// Status snapshot at signing time.
    pub status: SignatureStatus,
    /// Specification version at signing time.
    pub specification_version: String,
    /// Specification lifecycle status at signing time.
    pub specification_status_at_signing: String,
    /// Related approval identifiers.
    #[serde(default)]
    pub related_approvals: Vec<String>,
    /// Tool version that produced the record.
    pub oracle_version: String,
}

/// The MAC input of a [`SignatureRecord`].
#[derive(Serialize)]
struct RecordBinding<'a> {
    signature_id: &'a str,
    specification_path: &'a str,
    algorithm: &'a str,
    content_hash: &'a str,
    key_identifier: &'a str,
    signer_email: &'a str,
    signer_role: &'a str,
    signing_reason: &'a str,
    signing_timestamp: String,
    valid_from: String,
    expires_at: String,
    specification_version: &'a str,
    specification_status_at_signing: &'a str,
    related_approvals: &'a [String],
    oracle_version: &'a str,
}

impl SignatureRecord {
    /// Returns the canonical bytes the MAC is computed over.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Canonicalization`] if encoding fails.
    pub fn binding_bytes(&self) -> Result<Vec<u8>, SigningError> {
        canonical_json(&RecordBinding {
            signature_id: &self.signature_id,
            specification_path: &self.specification_path,
            algorithm: &self.algorithm,
            content_hash: &self.content_hash,
            key_identifier: &self.key_identifier,
            signer_email: &self.signer.email,
            signer_role: &self.signer.role,
            signing_reason: &self.signer.signing_reason,
            signing_timestamp: rfc3339(self.signing_timestamp),
            valid_from: rfc3339(self.valid_from),
            expires_at: rfc3339(self.expires_at),
            specification_version: &self.specification_version,
            specification_status_at_signing: &self.specification_status_at_signing,
            related_approvals: &self.related_approvals,
            oracle_version: &self.oracle_version,
        })
    }

    /// Computes the MAC over the binding and stores it in `signature_value`.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization and keying errors.
    pub(crate) fn seal(&mut self, key: &SigningKey) -> Result<(), SigningError> {
        let mac = key.mac(&self.binding_bytes()?)?;
        self.signature_value = hex::encode(mac);
        Ok(())
    }

    /// Recomputes the MAC and compares it to `signature_value` in constant
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the record fails
    /// [`Self::validate`] or the stored MAC is not valid hex.
    pub fn verify_mac(&self, key: &SigningKey) -> Result<bool, SigningError> {
        self.validate()?;
        let expected = hex::decode(&self.signature_value).map_err(|err| {
            SigningError::MalformedSignature(format!("signature_value is not hex: {err}"))
        })?;
        key.verify_mac(&self.binding_bytes()?, &expected)
    }

    /// Returns the bare hex digest from `content_hash`.
    #[must_use]
    pub fn content_digest(&self) -> Option<&str> {
        ContentHasher::strip_prefix(&self.content_hash)
    }

    /// Checks the structural invariants of a loaded record.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] on an unknown algorithm,
    /// a content hash without the `sha256:` prefix, a non-normalized path,
    /// or an empty validity window.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.algorithm != MAC_ALGORITHM {
            return Err(SigningError::MalformedSignature(format!(
                "unsupported algorithm {:?}, expected {MAC_ALGORITHM}",
                self.algorithm
            )));
        }
        if self.content_digest().is_none() {
            return Err(SigningError::MalformedSignature(format!(
                "content_hash {:?} is not a sha256: digest",
                self.content_hash
            )));
        }
        validate_claim_path(&self.specification_path)?;
        if self.expires_at <= self.valid_from {
            return Err(SigningError::MalformedSignature(
                "expires_at must be after valid_from".into(),
            ));
        }
        Ok(())
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Builds a signature identifier from the signing instant and the first
/// document's file stem.
#[must_use]
pub fn signature_id(issued_at: DateTime<Utc>, document_path: &str) -> String {
    format!(
        "sig_{}_{}",
        issued_at.format("%Y%m%d%H%M%S"),
        slug(document_path)
    )
}

fn slug(document_path: &str) -> String {
    let file_name = document_path.rsplit('/').next().unwrap_or(document_path);
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);

    let mut slug = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::ORACLE_VERSION;

    fn key() -> SigningKey {
        SigningKey::new("test", SecretString::from("test-secret-key-for-hmac-signing")).unwrap()
    }

    fn record() -> SignatureRecord {
        let valid_from = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut record = SignatureRecord {
            signature_id: signature_id(valid_from, "docs/specs/auth.md"),
            specification_path: "docs/specs/auth.md".into(),
            algorithm: MAC_ALGORITHM.into(),
            signature_value: String::new(),
            content_hash: ContentHasher::prefixed(&ContentHasher::hash(b"auth")),
            key_identifier: "test".into(),
            signer: SignerInfo::new("alice@example.com", "architect", "Approved"),
            signing_timestamp: valid_from,
            valid_from,
            expires_at: valid_from + Duration::days(90),
            status: SignatureStatus::Active,
            specification_version: "1.0.0".into(),
            specification_status_at_signing: "approved".into(),
            related_approvals: vec!["APR-1".into()],
            oracle_version: ORACLE_VERSION.into(),
        };
        record.seal(&key()).unwrap();
        record
    }

    #[test]
    fn test_signature_id_format() {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(signature_id(at, "docs/specs/auth.md"), "sig_20260102030405_auth");
        assert_eq!(
            signature_id(at, "docs/User Guide (v2).spec.md"),
            "sig_20260102030405_user-guide-v2-spec"
        );
        assert_eq!(signature_id(at, "docs/___.md"), "sig_20260102030405_document");
    }

    #[test]
    fn test_sealed_record_verifies() {
        assert!(record().verify_mac(&key()).unwrap());
    }

    #[test]
    fn test_status_is_not_bound() {
        let mut record = record();
        record.status = SignatureStatus::Expired;
        assert!(record.verify_mac(&key()).unwrap());
    }

    #[test]
    fn test_bound_fields_invalidate_mac() {
        let mut changed = record();
        changed.signer.role = "intern".into();
        assert!(!changed.verify_mac(&key()).unwrap());

        let mut changed = record();
        changed.expires_at += Duration::days(1);
        assert!(!changed.verify_mac(&key()).unwrap());

        let mut changed = record();
        changed.related_approvals.push("APR-2".into());
        assert!(!changed.verify_mac(&key()).unwrap());
    }

    #[test]
    fn test_validate_rejects_unknown_algorithm() {
        let mut record = record();
        record.algorithm = "none".into();
        assert!(matches!(record.verify_mac(&key()), Err(SigningError::MalformedSignature(_))));
    }

    #[test]
    fn test_validate_rejects_unprefixed_hash() {
        let mut record = record();
        record.content_hash = ContentHasher::hash(b"auth");
        assert!(matches!(record.validate(), Err(SigningError::MalformedSignature(_))));
    }

    #[test]
    fn test_non_hex_signature_value_is_malformed() {
        let mut record = record();
        record.signature_value = "zz".into();
        assert!(matches!(record.verify_mac(&key()), Err(SigningError::MalformedSignature(_))));
    }

    #[test]
    fn test_yaml_uses_flat_signer_keys() {
        let yaml = serde_yaml::to_string(&record()).unwrap();
        assert!(yaml.contains("signer_email: alice@example.com"));
        assert!(yaml.contains("signer_role: architect"));
        assert!(yaml.contains("signing_reason: Approved"));
        assert!(yaml.contains("status: active"));

        let parsed: SignatureRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, record());
    }
}

//! The persisted signature artifact.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::signature_id;
use super::{CompactSignature, SignatureRecord, SignerInfo, SigningError};

/// Which signature shape to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    /// One document, one [`SignatureRecord`].
    #[default]
    SingleDocument,
    /// One or more documents in a [`CompactSignature`].
    ClaimBundle,
}

impl FormatKind {
    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleDocument => "single-document",
            Self::ClaimBundle => "claim-bundle",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-document" => Ok(Self::SingleDocument),
            "claim-bundle" => Ok(Self::ClaimBundle),
            other => Err(format!(
                "unknown signature format '{other}', expected single-document or claim-bundle"
            )),
        }
    }
}

/// A signature of either shape, tagged by `format` when persisted.
///
/// ```yaml
/// format: claim-bundle
/// token: eyJhbGciOiJIUzI1NiIsInR5cCI6Ik9SQyJ9.eyJ...
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "kebab-case")]
pub enum SignatureFormat {
    /// A single-document record.
    SingleDocument(SignatureRecord),
    /// A compact claim bundle.
    ClaimBundle(CompactSignature),
}

impl SignatureFormat {
    /// Returns the shape of this signature.
    #[must_use]
    pub const fn kind(&self) -> FormatKind {
        match self {
            Self::SingleDocument(_) => FormatKind::SingleDocument,
            Self::ClaimBundle(_) => FormatKind::ClaimBundle,
        }
    }

    /// Returns the signature identifier.
    ///
    /// Claim bundles carry no stored identifier; theirs is derived from the
    /// issue time and the first covered document.
    #[must_use]
    pub fn signature_id(&self) -> String {
        match self {
            Self::SingleDocument(record) => record.signature_id.clone(),
            Self::ClaimBundle(bundle) => {
                let claims = bundle.claims();
                let first = claims.documents.first().map_or("", |doc| doc.path.as_str());
                signature_id(claims.issued_at_utc(), first)
            },
        }
    }

    /// Returns the embedded signer metadata.
    #[must_use]
    pub fn signer(&self) -> SignerInfo {
        match self {
            Self::SingleDocument(record) => record.signer.clone(),
            Self::ClaimBundle(bundle) => bundle.claims().signer(),
        }
    }

    /// Returns the start of the validity window.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        match self {
            Self::SingleDocument(record) => record.valid_from,
            Self::ClaimBundle(bundle) => bundle.claims().issued_at_utc(),
        }
    }

    /// Returns the end of the validity window.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Self::SingleDocument(record) => record.expires_at,
            Self::ClaimBundle(bundle) => bundle.claims().expires_at_utc(),
        }
    }

    /// Returns the project-relative paths this signature covers.
    #[must_use]
    pub fn document_paths(&self) -> Vec<&str> {
        match self {
            Self::SingleDocument(record) => vec![record.specification_path.as_str()],
            Self::ClaimBundle(bundle) => bundle
                .claims()
                .documents
                .iter()
                .map(|doc| doc.path.as_str())
                .collect(),
        }
    }

    /// Serializes the artifact as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Canonicalization`] if encoding fails.
    pub fn to_yaml(&self) -> Result<String, SigningError> {
        serde_yaml::to_string(self).map_err(|err| SigningError::Canonicalization(err.to_string()))
    }

    /// Parses a YAML artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the text is not a
    /// tagged signature artifact or its content is structurally invalid.
    pub fn from_yaml(text: &str) -> Result<Self, SigningError> {
        let signature: Self = serde_yaml::from_str(text)
            .map_err(|err| SigningError::MalformedSignature(err.to_string()))?;
        if let Self::SingleDocument(record) = &signature {
            record.validate()?;
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kind_parse_and_display() {
        assert_eq!("claim-bundle".parse::<FormatKind>().unwrap(), FormatKind::ClaimBundle);
        assert_eq!(FormatKind::SingleDocument.to_string(), "single-document");
        assert!("jwt".parse::<FormatKind>().is_err());
        assert_eq!(FormatKind::default(), FormatKind::SingleDocument);
    }

    #[test]
    fn test_untagged_yaml_is_malformed() {
        let yaml = "signature_id: sig_1\nalgorithm: HMAC-SHA256\n";
        assert!(matches!(
            SignatureFormat::from_yaml(yaml),
            Err(SigningError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_bad_token_is_malformed() {
        let yaml = "format: claim-bundle\ntoken: not-a-token\n";
        assert!(matches!(
            SignatureFormat::from_yaml(yaml),
            Err(SigningError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            SignatureFormat::from_yaml(": : :\n- ["),
            Err(SigningError::MalformedSignature(_))
        ));
    }
}

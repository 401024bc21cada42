//! Compact `header.claims.signature` encoding for claim bundles.
//!
//! The layout borrows the three-part shape of a JWS compact serialization
//! but is a closed internal format: the header type is `ORC`, the claims are
//! [`SignatureClaims`], and no JWT library is expected to accept it.
//!
//! ```text
//! base64url(jcs(header)) "." base64url(jcs(claims)) "." base64url(hmac)
//! ```
//!
//! The MAC input is the first two segments joined by `.`, exactly as they
//! appear in the token. Verification never re-encodes decoded claims.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::canonical::canonical_json;
use super::{SignatureClaims, SigningError};
use crate::crypto::SigningKey;

/// Header `alg` value.
pub const COMPACT_ALGORITHM: &str = "HS256";

/// Header `typ` value.
pub const COMPACT_TYPE: &str = "ORC";

#[derive(Debug, Serialize, Deserialize)]
struct CompactHeader {
    alg: String,
    typ: String,
}

impl Default for CompactHeader {
    fn default() -> Self {
        Self {
            alg: COMPACT_ALGORITHM.to_string(),
            typ: COMPACT_TYPE.to_string(),
        }
    }
}

/// Persisted form of a [`CompactSignature`].
#[derive(Debug, Serialize, Deserialize)]
struct CompactToken {
    token: String,
}

/// A claim-bundle signature in compact form.
///
/// Construct with [`CompactSignature::encode`] when signing or
/// [`CompactSignature::parse`] when loading; both guarantee the decoded
/// claims satisfy [`SignatureClaims::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CompactToken", into = "CompactToken")]
pub struct CompactSignature {
    header: String,
    claims: String,
    signature: String,
    raw: String,
    decoded: SignatureClaims,
}

impl CompactSignature {
    /// Signs `claims` with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the claims violate
    /// their invariants, or a canonicalization or keying error.
    pub fn encode(claims: SignatureClaims, key: &SigningKey) -> Result<Self, SigningError> {
        claims.validate()?;

        let header = URL_SAFE_NO_PAD.encode(canonical_json(&CompactHeader::default())?);
        let encoded_claims = URL_SAFE_NO_PAD.encode(canonical_json(&claims)?);
        let signing_input = format!("{header}.{encoded_claims}");
        let signature = URL_SAFE_NO_PAD.encode(key.mac(signing_input.as_bytes())?);
        let raw = format!("{signing_input}.{signature}");

        Ok(Self {
            header,
            claims: encoded_claims,
            signature,
            raw,
            decoded: claims,
        })
    }

    /// Parses a compact token without checking its MAC.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the token does not
    /// have three base64url segments, the header is not `HS256`/`ORC`, or
    /// the claims do not decode to a valid [`SignatureClaims`].
    pub fn parse(raw: &str) -> Result<Self, SigningError> {
        let raw = raw.trim();
        let mut parts = raw.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("token must have exactly three segments"));
        };

        let parsed_header: CompactHeader = decode_json(header, "header")?;
        if parsed_header.alg != COMPACT_ALGORITHM || parsed_header.typ != COMPACT_TYPE {
            return Err(malformed(&format!(
                "unsupported header alg={} typ={}",
                parsed_header.alg, parsed_header.typ
            )));
        }

        let decoded: SignatureClaims = decode_json(claims, "claims")?;
        decoded.validate()?;
        decode_segment(signature, "signature")?;

        Ok(Self {
            header: header.to_string(),
            claims: claims.to_string(),
            signature: signature.to_string(),
            raw: raw.to_string(),
            decoded,
        })
    }

    /// Recomputes the MAC over the first two segments and compares it to the
    /// third in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MalformedSignature`] if the signature segment
    /// is not base64url, or a keying error.
    pub fn verify_mac(&self, key: &SigningKey) -> Result<bool, SigningError> {
        let expected = decode_segment(&self.signature, "signature")?;
        let signing_input = format!("{}.{}", self.header, self.claims);
        key.verify_mac(signing_input.as_bytes(), &expected)
    }

    /// Returns the decoded claims.
    #[must_use]
    pub const fn claims(&self) -> &SignatureClaims {
        &self.decoded
    }

    /// Returns the full `header.claims.signature` token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<CompactToken> for CompactSignature {
    type Error = SigningError;

    fn try_from(token: CompactToken) -> Result<Self, Self::Error> {
        Self::parse(&token.token)
    }
}

impl From<CompactSignature> for CompactToken {
    fn from(signature: CompactSignature) -> Self {
        Self {
            token: signature.raw,
        }
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, SigningError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| malformed(&format!("{what} segment is not base64url: {err}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, SigningError> {
    let bytes = decode_segment(segment, what)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| malformed(&format!("{what} is not valid JSON: {err}")))
}

fn malformed(message: &str) -> SigningError {
    SigningError::MalformedSignature(message.to_string())
}

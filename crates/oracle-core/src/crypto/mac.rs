//! HMAC-SHA256 keyed MAC over canonical claim bytes.

use std::fmt;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::signing::SigningError;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label persisted in single-document signature records.
pub const MAC_ALGORITHM: &str = "HMAC-SHA256";

/// A shared signing secret plus the opaque label it is known by.
///
/// The key identifier is recorded in signature artifacts so a verifier can
/// tell which secret was used; the secret itself is never persisted, cached,
/// or logged by this crate. Callers construct a `SigningKey` for every
/// operation from whatever source their boundary layer uses.
pub struct SigningKey {
    key_identifier: String,
    secret: SecretString,
}

impl SigningKey {
    /// Minimum secret length in bytes.
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Creates a signing key from a secret and its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::SecretTooShort`] if the secret is shorter than
    /// [`Self::MIN_SECRET_LENGTH`] bytes.
    pub fn new(
        key_identifier: impl Into<String>,
        secret: SecretString,
    ) -> Result<Self, SigningError> {
        if secret.expose_secret().len() < Self::MIN_SECRET_LENGTH {
            return Err(SigningError::SecretTooShort {
                min_length: Self::MIN_SECRET_LENGTH,
            });
        }
        Ok(Self {
            key_identifier: key_identifier.into(),
            secret,
        })
    }

    /// Returns the opaque label of this key.
    #[must_use]
    pub fn key_identifier(&self) -> &str {
        &self.key_identifier
    }

    /// Computes HMAC-SHA256 over `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidKey`] if the MAC cannot be keyed.
    pub fn mac(&self, payload: &[u8]) -> Result<Vec<u8>, SigningError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Checks `expected` against the MAC of `payload` in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidKey`] if the MAC cannot be keyed.
    pub fn verify_mac(&self, payload: &[u8], expected: &[u8]) -> Result<bool, SigningError> {
        let computed = self.mac(payload)?;
        if computed.len() != expected.len() {
            return Ok(false);
        }
        Ok(computed.ct_eq(expected).into())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_identifier", &self.key_identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-hmac-signing";

    fn test_key() -> SigningKey {
        SigningKey::new("test-key", SecretString::from(SECRET)).unwrap()
    }

    #[test]
    fn test_mac_matches_reference_hmac() {
        let mut reference = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        reference.update(b"payload");
        let expected = reference.finalize().into_bytes().to_vec();

        assert_eq!(test_key().mac(b"payload").unwrap(), expected);
    }

    #[test]
    fn test_verify_mac_accepts_own_mac() {
        let key = test_key();
        let mac = key.mac(b"claims").unwrap();
        assert!(key.verify_mac(b"claims", &mac).unwrap());
    }

    #[test]
    fn test_verify_mac_rejects_other_payload() {
        let key = test_key();
        let mac = key.mac(b"claims").unwrap();
        assert!(!key.verify_mac(b"claims!", &mac).unwrap());
    }

    #[test]
    fn test_verify_mac_rejects_other_secret() {
        let secret = SecretString::from("another-secret-key-for-hmac-sign!");
        let other = SigningKey::new("other", secret).unwrap();
        let mac = other.mac(b"claims").unwrap();
        assert!(!test_key().verify_mac(b"claims", &mac).unwrap());
    }

    #[test]
    fn test_verify_mac_rejects_truncated_mac() {
        let key = test_key();
        let mac = key.mac(b"claims").unwrap();
        assert!(!key.verify_mac(b"claims", &mac[..16]).unwrap());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = SigningKey::new("short", SecretString::from("short"));
        assert!(matches!(
            result,
            Err(SigningError::SecretTooShort { min_length: 32 })
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_key());
        assert!(rendered.contains("test-key"));
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("[REDACTED]"));
    }
}

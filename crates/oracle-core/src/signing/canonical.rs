//! Canonical JSON (RFC 8785) encoding for MAC input.
//!
//! Every byte that enters a MAC goes through [`canonical_json`]. Signing and
//! verification therefore hash identical bytes for identical values,
//! independent of struct field order or map iteration order.

use serde::Serialize;

use super::SigningError;

/// Serializes `value` as JCS canonical JSON.
///
/// # Errors
///
/// Returns [`SigningError::Canonicalization`] if the value cannot be
/// represented as JSON (for example a map with non-string keys).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, SigningError> {
    serde_jcs::to_vec(value).map_err(|err| SigningError::Canonicalization(err.to_string()))
}

//! Cryptographic primitives for document signing.
//!
//! This module provides the two primitives the signing subsystem is built on:
//!
//! - **SHA-256 content hashing**: a fixed-output digest of a document's bytes,
//!   used to detect any modification ([`ContentHasher`])
//! - **HMAC-SHA256**: a keyed MAC over canonical claim bytes, proving both
//!   integrity and possession of the shared secret ([`SigningKey`])
//!
//! # Security Properties
//!
//! - The secret is wrapped in `SecretString` and never appears in `Debug`
//!   output or logs
//! - MAC comparison is constant time via the `subtle` crate
//! - There is no asymmetric key material; a shared secret is not a
//!   non-repudiation mechanism

mod hash;
mod mac;

pub use hash::{CONTENT_HASH_PREFIX, ContentHasher, DIGEST_HEX_LEN};
pub use mac::{MAC_ALGORITHM, SigningKey};

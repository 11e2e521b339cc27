//! Deterministic keyed fingerprints (HMAC-SHA256).
//!
//! Same key and same bytes always give the same digest, across parties and
//! runs. This deliberately leaks equality of plaintexts, which is what makes
//! fingerprint columns joinable.

use crate::error::CryptoResult;
use crate::key::{hmac_sha256, DerivedKey};
use cleanroom_types::DIGEST_SIZE;

/// Computes the fingerprint of `plaintext` under `key`.
pub fn fingerprint(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<[u8; DIGEST_SIZE]> {
    hmac_sha256(key.as_bytes(), &[plaintext])
}

//! Key derivation and management.
//!
//! A collaboration shares one secret. Two independent keys are derived from
//! it with HKDF-SHA256 (RFC 5869), salted with the collaboration id:
//!
//! ```text
//! prk             = HMAC(salt = collaboration id, ikm = shared secret)
//! fingerprint_key = HMAC(prk, "cleanroom-fingerprint-v1" || 0x01)
//! seal_key        = HMAC(prk, "cleanroom-seal-v1" || 0x01)
//! ```
//!
//! Each output is exactly one SHA-256 block, so a single expand round suffices.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use cleanroom_types::CollaborationId;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Size of derived keys in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Minimum accepted shared-secret length in bytes.
pub const MIN_SECRET_SIZE: usize = 32;

const FINGERPRINT_INFO: &[u8] = b"cleanroom-fingerprint-v1";
const SEAL_INFO: &[u8] = b"cleanroom-seal-v1";
const SCOPE_LABEL: &[u8] = b"cleanroom-scope-v1:";
const EXPAND_COUNTER: &[u8] = &[1];

/// A derived key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derives a sub-key bound to `label`.
    ///
    /// Used to give fingerprint columns their own key when joins across
    /// differently named columns are not allowed.
    pub fn scoped(&self, label: &str) -> CryptoResult<DerivedKey> {
        let bytes = hmac_sha256(&self.bytes, &[SCOPE_LABEL, label.as_bytes()])?;
        Ok(DerivedKey::from_bytes(bytes))
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The secret shared by every party of a collaboration.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: Vec<u8>,
}

impl SharedSecret {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decodes a standard-base64 secret.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(format!("shared secret is not base64: {e}")))?;
        Ok(Self { bytes })
    }

    /// Generates a random secret of [`MIN_SECRET_SIZE`] bytes.
    pub fn random() -> Self {
        let mut bytes = vec![0u8; MIN_SECRET_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encodes as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The pair of keys used for one run.
#[derive(Clone, Debug)]
pub struct KeyMaterial {
    pub fingerprint_key: DerivedKey,
    pub seal_key: DerivedKey,
}

/// Derives the fingerprint and seal keys of a collaboration.
///
/// # Errors
/// `KeyDerivation` if the secret is empty or shorter than
/// [`MIN_SECRET_SIZE`] bytes.
pub fn derive_keys(
    secret: &SharedSecret,
    collaboration_id: &CollaborationId,
) -> CryptoResult<KeyMaterial> {
    if secret.is_empty() {
        return Err(CryptoError::KeyDerivation("shared secret is empty".into()));
    }
    if secret.len() < MIN_SECRET_SIZE {
        return Err(CryptoError::KeyDerivation(format!(
            "shared secret must be at least {MIN_SECRET_SIZE} bytes, got {}",
            secret.len()
        )));
    }

    let mut prk = hkdf_extract(collaboration_id.as_bytes(), &secret.bytes)?;
    let fingerprint_key = DerivedKey::from_bytes(hkdf_expand_block(&prk, FINGERPRINT_INFO)?);
    let seal_key = DerivedKey::from_bytes(hkdf_expand_block(&prk, SEAL_INFO)?);
    prk.zeroize();

    Ok(KeyMaterial {
        fingerprint_key,
        seal_key,
    })
}

/// Generates a random key (tests and one-off sealing).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}

/// HKDF-SHA256 extract step.
fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    hmac_sha256(salt, &[ikm])
}

/// HKDF-SHA256 expand step for a single 32-byte block, T(1).
fn hkdf_expand_block(prk: &[u8], info: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    hmac_sha256(prk, &[info, EXPAND_COUNTER])
}

pub(crate) fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> CryptoResult<[u8; KEY_SIZE]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 2.
    #[test]
    fn hmac_matches_rfc4231() {
        let parts = [b"what do ya want ".as_slice(), b"for nothing?".as_slice()];
        let mac = hmac_sha256(b"Jefe", &parts).unwrap();
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(mac, expected);
    }

    // RFC 5869 appendix A.1, first 32 bytes of OKM.
    #[test]
    fn hkdf_matches_rfc5869() {
        let ikm = [0x0bu8; 22];
        let salt: Vec<u8> = (0x00u8..=0x0c).collect();
        let info: Vec<u8> = (0xf0u8..=0xf9).collect();

        let prk = hkdf_extract(&salt, &ikm).unwrap();
        let expected_prk = [
            0x07, 0x77, 0x09, 0x36, 0x2c, 0x2e, 0x32, 0xdf, 0x0d, 0xdc, 0x3f, 0x0d, 0xc4, 0x7b,
            0xba, 0x63, 0x90, 0xb6, 0xc7, 0x3b, 0xb5, 0x0f, 0x9c, 0x31, 0x22, 0xec, 0x84, 0x4a,
            0xd7, 0xc2, 0xb3, 0xe5,
        ];
        assert_eq!(prk, expected_prk);

        let okm = hkdf_expand_block(&prk, &info).unwrap();
        let expected_okm = [
            0x3c, 0xb2, 0x5f, 0x25, 0xfa, 0xac, 0xd5, 0x7a, 0x90, 0x43, 0x4f, 0x64, 0xd0, 0x36,
            0x2f, 0x2a, 0x2d, 0x2d, 0x0a, 0x90, 0xcf, 0x1a, 0x5a, 0x4c, 0x5d, 0xb0, 0x2d, 0x56,
            0xec, 0xc4, 0xc5, 0xbf,
        ];
        assert_eq!(okm, expected_okm);
    }

    #[test]
    fn derive_keys_is_hkdf_keyed_by_collaboration() {
        let id = CollaborationId::parse("0f0e0d0c-0b0a-4908-8706-050403020100").unwrap();
        let secret = SharedSecret::from_bytes(vec![0x42; 32]);
        let keys = derive_keys(&secret, &id).unwrap();

        let prk = hkdf_extract(id.as_bytes(), &[0x42; 32]).unwrap();
        let seal = DerivedKey::from_bytes(hkdf_expand_block(&prk, SEAL_INFO).unwrap());
        let fp = DerivedKey::from_bytes(hkdf_expand_block(&prk, FINGERPRINT_INFO).unwrap());
        assert_eq!(keys.seal_key.as_bytes(), seal.as_bytes());
        assert_eq!(keys.fingerprint_key.as_bytes(), fp.as_bytes());
    }
}

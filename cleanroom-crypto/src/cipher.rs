//! Sealing using ChaCha20-Poly1305.
//!
//! Provides authenticated encryption with associated data (AEAD). Every call
//! to [`seal`] draws a fresh nonce from the OS CSPRNG; nonces are never
//! derived from counters because uniqueness across processes sharing a key
//! cannot be guaranteed.
//!
//! Wire layout of a sealed blob: `nonce(12) ∥ ciphertext ∥ tag(16)`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Bytes a sealed blob adds on top of its plaintext.
pub const SEAL_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// A sealed value split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedData {
    /// The nonce used for encryption (unique per encryption).
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext, auth tag included.
    pub ciphertext: Vec<u8>,
}

impl SealedData {
    /// Returns the total size of the sealed blob.
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// Returns true if the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Concatenates into `nonce ∥ ciphertext ∥ tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Splits a blob produced by [`SealedData::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < SEAL_OVERHEAD {
            return Err(CryptoError::Truncated {
                expected: SEAL_OVERHEAD,
                actual: bytes.len(),
            });
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Seals `plaintext` with no associated context.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    seal_in_context(key, &[], plaintext)
}

/// Opens a blob produced by [`seal`].
pub fn unseal(key: &DerivedKey, blob: &[u8]) -> CryptoResult<Vec<u8>> {
    unseal_in_context(key, &[], blob)
}

/// Seals `plaintext`, binding `context` as associated data.
///
/// The blob only opens under the same key *and* the same context.
pub fn seal_in_context(
    key: &DerivedKey,
    context: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    Ok(seal_parts(key, context, plaintext)?.to_bytes())
}

/// Opens a blob produced by [`seal_in_context`].
///
/// The tag is verified before any plaintext is released; on failure the
/// caller gets [`CryptoError::Authentication`] and nothing else.
pub fn unseal_in_context(
    key: &DerivedKey,
    context: &[u8],
    blob: &[u8],
) -> CryptoResult<Vec<u8>> {
    let sealed = SealedData::from_bytes(blob)?;
    unseal_parts(key, context, &sealed)
}

/// Seals into separate nonce and ciphertext parts.
pub fn seal_parts(
    key: &DerivedKey,
    context: &[u8],
    plaintext: &[u8],
) -> CryptoResult<SealedData> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: context,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(SealedData {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens separate nonce and ciphertext parts.
pub fn unseal_parts(
    key: &DerivedKey,
    context: &[u8],
    sealed: &SealedData,
) -> CryptoResult<Vec<u8>> {
    if sealed.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::Truncated {
            expected: SEAL_OVERHEAD,
            actual: sealed.len(),
        });
    }
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&sealed.nonce);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &sealed.ciphertext,
                aad: context,
            },
        )
        .map_err(|_| CryptoError::Authentication)
}

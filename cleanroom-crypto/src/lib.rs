//! Cryptographic primitives for the cleanroom transform engine.
//!
//! Provides:
//! - HKDF-SHA256 derivation of per-collaboration keys from a shared secret
//! - HMAC-SHA256 fingerprints for joinable pseudonymization
//! - ChaCha20-Poly1305 sealing with random nonces
//! - Key types that zeroize on drop and never print their bytes
//!
//! # Keys
//!
//! Every party of a collaboration holds the same shared secret. The
//! collaboration id salts the derivation, so reusing one secret across
//! collaborations never yields interchangeable keys:
//!
//! 1. **Fingerprint key**: keys the HMAC applied to fingerprint columns.
//! 2. **Seal key**: keys the AEAD applied to sealed columns.

mod cipher;
mod error;
mod fingerprint;
mod key;

pub use cipher::{
    seal, seal_in_context, seal_parts, unseal, unseal_in_context, unseal_parts, SealedData,
    NONCE_SIZE, SEAL_OVERHEAD, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::fingerprint;
pub use key::{
    derive_keys, generate_random_key, DerivedKey, KeyMaterial, SharedSecret, KEY_SIZE,
    MIN_SECRET_SIZE,
};

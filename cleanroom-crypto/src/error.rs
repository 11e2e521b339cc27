//! Error types for the primitives layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (empty or malformed shared secret).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed inside the primitive.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The authentication tag did not verify (wrong key, wrong context or
    /// tampered data). No plaintext is released.
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    /// A sealed blob is too short to hold a nonce and a tag.
    #[error("sealed data truncated: need at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Secret or key could not be decoded from its textual form.
    #[error("invalid encoding: {0}")]
    Encoding(String),
}

impl CryptoError {
    /// Whether the error means sealed data failed verification.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication | Self::Truncated { .. })
    }
}

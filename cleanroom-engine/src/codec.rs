//! The plaintext envelope that gets sealed.
//!
//! ```text
//! version(1) ∥ tag(1) ∥ len(u32 BE) ∥ canonical bytes ∥ zero padding
//! ```
//!
//! With fixed padding every envelope in a column has the same size, so the
//! ciphertext length no longer reveals the plaintext length.

use cleanroom_schema::Pad;
use cleanroom_types::{Scalar, ENCODING_VERSION};

const HEADER_LEN: usize = 1 + 1 + 4;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EncodeError {
    PadOverflow { length: usize, actual: usize },
    Encoding(String),
}

/// Builds the envelope for `scalar`.
pub(crate) fn encode(scalar: &Scalar, pad: Pad) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(HEADER_LEN + 16);
    out.push(ENCODING_VERSION);
    scalar
        .encode_tagged(&mut out)
        .map_err(|e| EncodeError::Encoding(e.to_string()))?;

    if let Pad::Fixed { length } = pad {
        let actual = out.len() - HEADER_LEN;
        if actual > length {
            return Err(EncodeError::PadOverflow { length, actual });
        }
        out.resize(HEADER_LEN + length, 0);
    }
    Ok(out)
}

/// Recovers the scalar from an envelope, ignoring trailing padding.
pub(crate) fn decode(envelope: &[u8]) -> Result<Scalar, String> {
    let (&version, tagged) = envelope
        .split_first()
        .ok_or_else(|| "empty envelope".to_string())?;
    if version != ENCODING_VERSION {
        return Err(format!("unsupported envelope version {version}"));
    }
    let (scalar, used) = Scalar::decode_tagged(tagged).map_err(|e| e.to_string())?;
    if tagged[used..].iter().any(|&b| b != 0) {
        return Err("non-zero bytes after value".into());
    }
    Ok(scalar)
}

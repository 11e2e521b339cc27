//! Cell values and their byte encodings.
//!
//! Two encodings are defined for every [`Scalar`]:
//!
//! - the **canonical** encoding, hashed when fingerprinting. It carries no
//!   framing, so equal plaintexts produce equal bytes across parties and runs:
//!
//!   | kind  | bytes                                                    |
//!   |-------|----------------------------------------------------------|
//!   | Text  | UTF-8                                                    |
//!   | Int   | 8-byte big-endian two's complement                       |
//!   | Float | 8-byte big-endian IEEE-754; `-0.0` → `0.0`, NaN → `0x7ff8000000000000` |
//!   | Bool  | one byte, `0` or `1`                                     |
//!   | Date  | 4-byte big-endian days since 1970-01-01                  |
//!   | Bytes | raw                                                      |
//!
//! - the **tagged** encoding, sealed when encrypting: `tag(1) ∥ len(u32 BE) ∥
//!   canonical`. It carries enough to reconstruct the original scalar.
//!
//! Changing either encoding requires bumping [`ENCODING_VERSION`].

use crate::Error;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Version of the value encodings.
pub const ENCODING_VERSION: u8 = 1;

/// Size of a fingerprint digest in bytes (HMAC-SHA256).
pub const DIGEST_SIZE: usize = 32;

/// Textual prefix of a fingerprint cell.
pub const FINGERPRINT_PREFIX: &str = "01:hmac:";

/// Textual prefix of a sealed cell.
pub const SEALED_PREFIX: &str = "01:enc:";

/// Day number of 1970-01-01 counted from 0001-01-01 (CE).
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// The kind of a plaintext scalar; doubles as the tag of the tagged encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarKind {
    Text = 1,
    Int = 2,
    Float = 3,
    Bool = 4,
    Date = 5,
    Bytes = 6,
}

impl ScalarKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Text),
            2 => Some(Self::Int),
            3 => Some(Self::Float),
            4 => Some(Self::Bool),
            5 => Some(Self::Date),
            6 => Some(Self::Bytes),
            _ => None,
        }
    }
}

/// A plaintext cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Days since 1970-01-01.
    Date(i32),
    Bytes(Vec<u8>),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Text(_) => ScalarKind::Text,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Date(_) => ScalarKind::Date,
            Scalar::Bytes(_) => ScalarKind::Bytes,
        }
    }

    /// Builds a date scalar from a `YYYY-MM-DD` string.
    pub fn date_from_str(s: &str) -> Result<Self, Error> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| Error::InvalidEncoding(format!("invalid date {s:?}: {e}")))?;
        Ok(Scalar::Date(date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS))
    }

    /// Canonical bytes of the value, without the type tag.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Text(s) => s.as_bytes().to_vec(),
            Scalar::Int(i) => i.to_be_bytes().to_vec(),
            Scalar::Float(f) => canonical_float_bits(*f).to_be_bytes().to_vec(),
            Scalar::Bool(b) => vec![u8::from(*b)],
            Scalar::Date(d) => d.to_be_bytes().to_vec(),
            Scalar::Bytes(b) => b.clone(),
        }
    }

    /// Bytes hashed by fingerprinting: the type tag, then the canonical bytes.
    ///
    /// The tag keeps values of different kinds with equal canonical bytes
    /// (`Int(0x6162636465666768)` and `Text("abcdefgh")`) from colliding.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let canonical = self.canonical_bytes();
        let mut out = Vec::with_capacity(1 + canonical.len());
        out.push(self.kind().tag());
        out.extend_from_slice(&canonical);
        out
    }

    /// Appends the tagged encoding to `out`.
    ///
    /// Floats keep their exact bits, so `-0.0` and NaN payloads survive a
    /// seal and unseal.
    pub fn encode_tagged(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let payload = match self {
            Scalar::Float(f) => f.to_bits().to_be_bytes().to_vec(),
            _ => self.canonical_bytes(),
        };
        let len = u32::try_from(payload.len()).map_err(|_| {
            Error::InvalidEncoding(format!("value of {} bytes is too large", payload.len()))
        })?;
        out.reserve(5 + payload.len());
        out.push(self.kind().tag());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(())
    }

    /// Decodes one tagged scalar from the front of `bytes`.
    ///
    /// Returns the scalar and the number of bytes consumed; anything after
    /// that is left to the caller.
    pub fn decode_tagged(bytes: &[u8]) -> Result<(Self, usize), Error> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::InvalidEncoding("missing type tag".into()))?;
        let kind = ScalarKind::from_tag(tag)
            .ok_or_else(|| Error::InvalidEncoding(format!("unknown type tag {tag}")))?;
        if rest.len() < 4 {
            return Err(Error::InvalidEncoding("truncated length".into()));
        }
        let (len_bytes, rest) = rest.split_at(4);
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        if rest.len() < len {
            return Err(Error::InvalidEncoding(format!(
                "payload declares {len} bytes, {} available",
                rest.len()
            )));
        }
        let payload = &rest[..len];
        let scalar = match kind {
            ScalarKind::Text => Scalar::Text(
                String::from_utf8(payload.to_vec())
                    .map_err(|e| Error::InvalidEncoding(format!("invalid UTF-8: {e}")))?,
            ),
            ScalarKind::Int => Scalar::Int(i64::from_be_bytes(fixed(payload)?)),
            ScalarKind::Float => Scalar::Float(f64::from_bits(u64::from_be_bytes(fixed(payload)?))),
            ScalarKind::Bool => match payload {
                [0] => Scalar::Bool(false),
                [1] => Scalar::Bool(true),
                _ => return Err(Error::InvalidEncoding("invalid boolean".into())),
            },
            ScalarKind::Date => Scalar::Date(i32::from_be_bytes(fixed(payload)?)),
            ScalarKind::Bytes => Scalar::Bytes(payload.to_vec()),
        };
        Ok((scalar, 5 + len))
    }
}

fn canonical_float_bits(f: f64) -> u64 {
    if f.is_nan() {
        CANONICAL_NAN_BITS
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

fn fixed<const N: usize>(payload: &[u8]) -> Result<[u8; N], Error> {
    payload.try_into().map_err(|_| {
        Error::InvalidEncoding(format!("expected {N} payload bytes, got {}", payload.len()))
    })
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Date(d) => match UNIX_EPOCH_CE_DAYS
                .checked_add(*d)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
            {
                Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                None => write!(f, "{d}"),
            },
            Scalar::Bytes(b) => f.write_str(&STANDARD.encode(b)),
        }
    }
}

/// A single cell together with its transform state.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Clear(Scalar),
    Fingerprint([u8; DIGEST_SIZE]),
    /// `nonce ∥ ciphertext ∥ tag`.
    Sealed(Vec<u8>),
}

impl Value {
    /// Shorthand for a cleartext string value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Clear(Scalar::Text(s.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value has already been through a transform.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Value::Fingerprint(_) | Value::Sealed(_))
    }

    /// Textual form used by text-based formats. `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Clear(s) => Some(s.to_string()),
            Value::Fingerprint(d) => Some(format!("{FINGERPRINT_PREFIX}{}", STANDARD.encode(d))),
            Value::Sealed(b) => Some(format!("{SEALED_PREFIX}{}", STANDARD.encode(b))),
        }
    }

    /// Recognizes the textual form of a fingerprint or sealed cell.
    ///
    /// Returns `Ok(None)` when `text` carries neither prefix, and an error
    /// when it carries one but the payload is malformed.
    pub fn parse_encrypted_text(text: &str) -> Result<Option<Value>, Error> {
        if let Some(b64) = text.strip_prefix(FINGERPRINT_PREFIX) {
            let bytes = STANDARD
                .decode(b64)
                .map_err(|e| Error::InvalidEncoding(format!("invalid fingerprint base64: {e}")))?;
            let digest: [u8; DIGEST_SIZE] = bytes.as_slice().try_into().map_err(|_| {
                Error::InvalidEncoding(format!(
                    "fingerprint is {} bytes, expected {DIGEST_SIZE}",
                    bytes.len()
                ))
            })?;
            return Ok(Some(Value::Fingerprint(digest)));
        }
        if let Some(b64) = text.strip_prefix(SEALED_PREFIX) {
            let bytes = STANDARD
                .decode(b64)
                .map_err(|e| Error::InvalidEncoding(format!("invalid sealed base64: {e}")))?;
            return Ok(Some(Value::Sealed(bytes)));
        }
        Ok(None)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Clear(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_display_roundtrip() {
        let d = Scalar::date_from_str("2024-02-29").unwrap();
        assert_eq!(d.to_string(), "2024-02-29");
        assert_eq!(Scalar::date_from_str("1970-01-01").unwrap(), Scalar::Date(0));
    }

    #[test]
    fn negative_zero_and_nan_are_canonical() {
        assert_eq!(
            Scalar::Float(-0.0).canonical_bytes(),
            Scalar::Float(0.0).canonical_bytes()
        );
        let quiet = f64::NAN;
        let other = f64::from_bits(0x7ff0_0000_0000_0001);
        assert!(other.is_nan());
        assert_eq!(
            Scalar::Float(quiet).canonical_bytes(),
            Scalar::Float(other).canonical_bytes()
        );
    }
}

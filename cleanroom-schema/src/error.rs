//! Error types for schema loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Schema configuration errors.
///
/// Every variant is a configuration error: it is raised before any row is
/// processed and aborts the run.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema declares no columns.
    #[error("schema has no columns")]
    Empty,

    /// A column name uses the reserved internal prefix.
    #[error("column {column:?} uses a reserved name")]
    ReservedName { column: String },

    /// Cleartext output while the policy forbids it.
    #[error("column {column:?} is cleartext but the collaboration does not allow cleartext")]
    CleartextNotAllowed { column: String },

    /// Two columns write the same target while the policy forbids it.
    #[error("target column {column:?} appears more than once")]
    DuplicateTarget { column: String },

    /// Joined fingerprint columns read differently-named sources.
    #[error(
        "join group {group:?} mixes source columns {first:?} and {second:?}, \
         but joins on columns with different names are not allowed"
    )]
    JoinNameMismatch {
        group: String,
        first: String,
        second: String,
    },

    /// A decrypt schema asks to reverse a fingerprint.
    #[error("column {column:?} is a fingerprint; fingerprints cannot be decrypted")]
    FingerprintNotReversible { column: String },

    /// A padding declaration is out of range.
    #[error("invalid padding on column {column:?}: {reason}")]
    InvalidPad { column: String, reason: String },

    /// An option was given on a column type it does not apply to.
    #[error("invalid option on column {column:?}: {reason}")]
    InvalidOption { column: String, reason: String },

    /// Malformed schema JSON.
    #[error("invalid schema json: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A column name failed normalization.
    #[error(transparent)]
    Header(#[from] cleanroom_types::Error),
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

//! Error types for the engine.

use cleanroom_crypto::CryptoError;
use cleanroom_io::IoError;
use cleanroom_schema::SchemaError;
use thiserror::Error;

/// A failure confined to one row.
///
/// Whether it aborts the run depends on [`RowError::is_fatal`] and the run's
/// [`RowErrorPolicy`](crate::RowErrorPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row has {actual} values, input header has {expected} columns")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("row has no value for column {column:?}")]
    MissingColumn { column: String },

    #[error("column {column:?} already holds an encrypted value")]
    AlreadyEncrypted { column: String },

    #[error("column {column:?} does not hold a sealed value")]
    NotSealed { column: String },

    #[error("value in column {column:?} is {actual} bytes, pad length is {length}")]
    PadOverflow {
        column: String,
        length: usize,
        actual: usize,
    },

    #[error("column {column:?} failed authentication")]
    Authentication { column: String },

    #[error("column {column:?} could not be decoded: {reason}")]
    Decoding { column: String, reason: String },

    #[error("column {column:?} could not be encrypted: {reason}")]
    Encryption { column: String, reason: String },
}

impl RowError {
    /// Fatal errors abort the run whatever the row error policy says.
    ///
    /// A failed tag or an undecodable envelope means the key or the data is
    /// wrong for the whole input, not just for this row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RowError::Authentication { .. }
                | RowError::Decoding { .. }
                | RowError::Encryption { .. }
        )
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[source] CryptoError),

    #[error("row {row_index} failed")]
    Row {
        row_index: u64,
        #[source]
        source: RowError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

impl EngineError {
    /// Whether the run was rejected before any row was processed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_) | EngineError::Schema(_))
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

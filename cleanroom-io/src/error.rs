//! Error types for row adapters.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while reading or writing rows.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header: {0}")]
    Header(#[from] cleanroom_types::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("column {0:?} appears more than once in the header")]
    DuplicateHeader(String),

    #[error("row has {actual} values, header has {expected} columns")]
    RowWidth { expected: usize, actual: usize },

    #[error("writer is closed")]
    Closed,

    #[error("output {0} already exists")]
    OutputExists(PathBuf),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("partition header {actual:?} does not match {expected:?}")]
    SchemaMismatch { expected: String, actual: String },
}

pub type IoResult<T> = Result<T, IoError>;

//! Core type definitions for the cleanroom transform engine.
//!
//! This crate defines the format-agnostic types every other crate in the
//! workspace depends on:
//! - [`CollaborationId`]: the UUID naming a collaboration
//! - [`ColumnHeader`] / [`TableHeader`]: normalized column names
//! - [`Scalar`] / [`Value`]: a single cell and its transform state
//! - [`Row`]: an ordered sequence of values
//!
//! Nothing here performs cryptography; encodings are defined so that the
//! crypto and engine crates agree on the exact bytes being hashed or sealed.

mod header;
mod ids;
mod row;
mod value;

pub use header::{ColumnHeader, TableHeader, MAX_HEADER_LEN, RESERVED_PREFIX};
pub use ids::CollaborationId;
pub use row::Row;
pub use value::{
    Scalar, ScalarKind, Value, DIGEST_SIZE, ENCODING_VERSION, FINGERPRINT_PREFIX, SEALED_PREFIX,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid collaboration id {0:?}: expected a UUID")]
    InvalidCollaborationId(String),

    #[error("invalid column header {header:?}: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("invalid value encoding: {0}")]
    InvalidEncoding(String),
}

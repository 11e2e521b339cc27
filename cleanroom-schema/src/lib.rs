//! Column schema and policy for the cleanroom engine.
//!
//! Defines the configuration every run is validated against:
//! - [`Schema`] / [`ColumnSpec`]: which input column feeds which output column, and how
//! - [`ClientSettings`] / [`Policy`]: the collaboration's boolean options and where they came from
//! - [`ValidatedSchema`]: a schema that passed [`Schema::validate`] for one [`Mode`]
//!
//! Validation happens exactly once, before the first row is read. Nothing in
//! this crate touches key material or row data.

mod error;
mod schema;
mod settings;
mod validate;

pub use error::{SchemaError, SchemaResult};
pub use schema::{ColumnSpec, Mode, Pad, Schema, TransformType, MAX_PAD_LENGTH};
pub use settings::{ClientSettings, Policy, PolicyOrigin};
pub use validate::ValidatedSchema;

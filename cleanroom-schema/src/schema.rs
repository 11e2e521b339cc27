use crate::error::{SchemaError, SchemaResult};
use crate::validate::ValidatedSchema;
use crate::ClientSettings;
use cleanroom_types::{ColumnHeader, TableHeader};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest fixed pad a sealed column may request, in bytes.
pub const MAX_PAD_LENGTH: usize = 10_000;

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// How a column is protected in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    /// Copied unchanged.
    Cleartext,
    /// Keyed hash, joinable across parties.
    Fingerprint,
    /// Authenticated encryption, reversible with the seal key.
    Sealed,
}

/// Padding applied to a sealed value before encryption.
///
/// Fixed padding hides the length of short values: every ciphertext in the
/// column has the same size as long as the plaintext fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pad {
    #[default]
    None,
    Fixed { length: usize },
}

impl Pad {
    pub fn is_none(&self) -> bool {
        matches!(self, Pad::None)
    }
}

/// One output column: where it reads from and how it is transformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub source: ColumnHeader,
    /// Output name. Defaults to the source name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ColumnHeader>,
    #[serde(rename = "type")]
    pub transform: TransformType,
    /// Fingerprint columns sharing a group are meant to be joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "joinGroup")]
    pub join_group: Option<String>,
    #[serde(default, skip_serializing_if = "Pad::is_none")]
    pub pad: Pad,
}

impl ColumnSpec {
    fn simple(source: &str, transform: TransformType) -> SchemaResult<Self> {
        Ok(Self {
            source: ColumnHeader::new(source)?,
            target: None,
            transform,
            join_group: None,
            pad: Pad::None,
        })
    }

    /// Shorthand for a cleartext column.
    pub fn cleartext(source: &str) -> SchemaResult<Self> {
        Self::simple(source, TransformType::Cleartext)
    }

    /// Shorthand for a fingerprint column.
    pub fn fingerprint(source: &str) -> SchemaResult<Self> {
        Self::simple(source, TransformType::Fingerprint)
    }

    /// Shorthand for a sealed column.
    pub fn sealed(source: &str) -> SchemaResult<Self> {
        Self::simple(source, TransformType::Sealed)
    }

    /// Writes the column under a different name.
    pub fn with_target(mut self, target: &str) -> SchemaResult<Self> {
        self.target = Some(ColumnHeader::new(target)?);
        Ok(self)
    }

    pub fn with_join_group(mut self, group: &str) -> Self {
        self.join_group = Some(group.to_string());
        self
    }

    pub fn with_pad(mut self, pad: Pad) -> Self {
        self.pad = pad;
        self
    }

    /// The output column name.
    pub fn target_header(&self) -> &ColumnHeader {
        self.target.as_ref().unwrap_or(&self.source)
    }
}

/// An ordered list of output columns, as loaded from configuration.
///
/// A `Schema` is unchecked; call [`Schema::validate`] to obtain the
/// [`ValidatedSchema`] the engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Parses the JSON form `{"columns": [...]}`.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a schema file.
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Output header, in column order.
    pub fn target_header(&self) -> TableHeader {
        self.columns
            .iter()
            .map(|c| c.target_header().clone())
            .collect()
    }

    /// Checks the schema against `settings` for a run in `mode`.
    pub fn validate(&self, settings: &ClientSettings, mode: Mode) -> SchemaResult<ValidatedSchema> {
        crate::validate::validate(self, settings, mode)
    }
}

//! One-shot schema validation.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{ColumnSpec, Mode, Pad, Schema, TransformType, MAX_PAD_LENGTH};
use crate::ClientSettings;
use cleanroom_types::{ColumnHeader, TableHeader};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A schema that passed validation for one mode.
///
/// Immutable and cheap to clone; every worker of a run shares the same
/// column list.
#[derive(Debug, Clone)]
pub struct ValidatedSchema {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    mode: Mode,
    columns: Vec<ColumnSpec>,
    target_header: TableHeader,
}

impl ValidatedSchema {
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.inner.columns
    }

    pub fn len(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.columns.is_empty()
    }

    /// Output header, in column order.
    pub fn target_header(&self) -> &TableHeader {
        &self.inner.target_header
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.inner.columns.iter()
    }
}

pub(crate) fn validate(
    schema: &Schema,
    settings: &ClientSettings,
    mode: Mode,
) -> SchemaResult<ValidatedSchema> {
    if schema.is_empty() {
        return Err(SchemaError::Empty);
    }

    for column in &schema.columns {
        check_reserved(column.source.clone())?;
        check_reserved(column.target_header().clone())?;
        check_options(column)?;

        match (mode, column.transform) {
            (Mode::Encrypt, TransformType::Cleartext) if !settings.allow_cleartext => {
                return Err(SchemaError::CleartextNotAllowed {
                    column: column.target_header().to_string(),
                });
            }
            (Mode::Decrypt, TransformType::Fingerprint) => {
                return Err(SchemaError::FingerprintNotReversible {
                    column: column.source.to_string(),
                });
            }
            _ => {}
        }
    }

    let target_header = schema.target_header();
    if !settings.allow_duplicates {
        if let Some(dup) = target_header.first_duplicate() {
            return Err(SchemaError::DuplicateTarget {
                column: dup.to_string(),
            });
        }
    }

    if !settings.allow_joins_on_columns_with_different_names {
        check_join_groups(schema)?;
    }

    debug!(columns = schema.len(), ?mode, "schema validated");

    Ok(ValidatedSchema {
        inner: Arc::new(Inner {
            mode,
            columns: schema.columns.clone(),
            target_header,
        }),
    })
}

fn check_reserved(header: ColumnHeader) -> SchemaResult<()> {
    if header.is_reserved() {
        return Err(SchemaError::ReservedName {
            column: header.into(),
        });
    }
    Ok(())
}

fn check_options(column: &ColumnSpec) -> SchemaResult<()> {
    let name = || column.target_header().to_string();

    if column.join_group.is_some() && column.transform != TransformType::Fingerprint {
        return Err(SchemaError::InvalidOption {
            column: name(),
            reason: "join_group only applies to fingerprint columns".into(),
        });
    }
    if let Some(group) = &column.join_group {
        if group.trim().is_empty() {
            return Err(SchemaError::InvalidOption {
                column: name(),
                reason: "join_group is blank".into(),
            });
        }
    }

    match column.pad {
        Pad::None => Ok(()),
        Pad::Fixed { .. } if column.transform != TransformType::Sealed => {
            Err(SchemaError::InvalidOption {
                column: name(),
                reason: "pad only applies to sealed columns".into(),
            })
        }
        Pad::Fixed { length } if length == 0 || length > MAX_PAD_LENGTH => {
            Err(SchemaError::InvalidPad {
                column: name(),
                reason: format!("length {length} is outside 1..={MAX_PAD_LENGTH}"),
            })
        }
        Pad::Fixed { .. } => Ok(()),
    }
}

/// Within a join group every fingerprint column must read the same source.
fn check_join_groups(schema: &Schema) -> SchemaResult<()> {
    let mut first_source: HashMap<&str, &ColumnHeader> = HashMap::new();
    for column in &schema.columns {
        let Some(group) = column.join_group.as_deref() else {
            continue;
        };
        match first_source.get(group) {
            Some(first) if **first != column.source => {
                return Err(SchemaError::JoinNameMismatch {
                    group: group.to_string(),
                    first: first.to_string(),
                    second: column.source.to_string(),
                });
            }
            Some(_) => {}
            None => {
                first_source.insert(group, &column.source);
            }
        }
    }
    Ok(())
}

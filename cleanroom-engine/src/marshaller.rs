//! Row marshalling: one input row in, one output row out.
//!
//! A [`Marshaller`] is bound once per run. Binding resolves every output
//! column to an input position and a ready-to-use key, so marshalling a row
//! does no lookups and never re-checks policy.

use crate::codec::{self, EncodeError};
use crate::error::{EngineError, EngineResult, RowError};
use cleanroom_crypto::{fingerprint, seal_in_context, unseal_in_context, DerivedKey, KeyMaterial};
use cleanroom_schema::{ClientSettings, ColumnSpec, Mode, Pad, TransformType, ValidatedSchema};
use cleanroom_types::{
    ColumnHeader, Row, Scalar, TableHeader, Value, FINGERPRINT_PREFIX, SEALED_PREFIX,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug)]
enum Op {
    Copy,
    Fingerprint(DerivedKey),
    Seal(Pad),
    Unseal,
}

#[derive(Debug)]
struct ColumnPlan {
    source_index: usize,
    source: ColumnHeader,
    target: ColumnHeader,
    op: Op,
}

/// Transforms rows according to a validated schema.
///
/// Shared read-only by every worker of a run.
#[derive(Debug)]
pub struct Marshaller {
    mode: Mode,
    input_header: TableHeader,
    output_header: TableHeader,
    plans: Vec<ColumnPlan>,
    seal_key: DerivedKey,
}

impl Marshaller {
    /// Binds `schema` to the header of the input being processed.
    ///
    /// # Errors
    /// A configuration error if a source column is missing from
    /// `input_header`, if a repeated input column is read more often than it
    /// appears, or if an encrypt run does not preserve nulls.
    pub fn new(
        schema: &ValidatedSchema,
        input_header: &TableHeader,
        keys: &KeyMaterial,
        settings: &ClientSettings,
    ) -> EngineResult<Self> {
        let mode = schema.mode();
        if mode == Mode::Encrypt && !settings.preserve_nulls {
            return Err(EngineError::config(
                "preserve_nulls is disabled: null values cannot be encrypted",
            ));
        }

        let mut uses: HashMap<&ColumnHeader, usize> = HashMap::new();
        let plans = schema
            .iter()
            .map(|column| {
                let use_index = uses.entry(&column.source).or_default();
                let source_index = bind_source(input_header, &column.source, *use_index)?;
                *use_index += 1;
                Ok(ColumnPlan {
                    source_index,
                    source: column.source.clone(),
                    target: column.target_header().clone(),
                    op: plan_op(mode, column, keys, settings)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        debug!(
            ?mode,
            input_columns = input_header.len(),
            output_columns = plans.len(),
            "schema bound to input"
        );

        Ok(Self {
            mode,
            input_header: input_header.clone(),
            output_header: schema.target_header().clone(),
            plans,
            seal_key: keys.seal_key.clone(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn input_header(&self) -> &TableHeader {
        &self.input_header
    }

    /// Header of every row [`marshal`](Self::marshal) produces.
    pub fn output_header(&self) -> &TableHeader {
        &self.output_header
    }

    /// Transforms one row.
    pub fn marshal(&self, row: &Row) -> Result<Row, RowError> {
        if row.width() != self.input_header.len() {
            return Err(RowError::WidthMismatch {
                expected: self.input_header.len(),
                actual: row.width(),
            });
        }

        let mut out = Row::with_capacity(self.plans.len());
        for plan in &self.plans {
            let value = row
                .get(plan.source_index)
                .ok_or_else(|| RowError::MissingColumn {
                    column: plan.source.to_string(),
                })?;
            out.push(self.marshal_value(plan, value)?);
        }
        Ok(out)
    }

    fn marshal_value(&self, plan: &ColumnPlan, value: &Value) -> Result<Value, RowError> {
        match (&plan.op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Op::Copy, _) => Ok(value.clone()),
            (Op::Unseal, _) => self.unseal_value(plan, value),
            (Op::Fingerprint(key), _) => {
                let scalar = plaintext(plan, value)?;
                let digest = fingerprint(key, &scalar.fingerprint_bytes()).map_err(|e| {
                    RowError::Encryption {
                        column: plan.target.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Value::Fingerprint(digest))
            }
            (Op::Seal(pad), _) => {
                let scalar = plaintext(plan, value)?;
                let envelope = codec::encode(scalar, *pad).map_err(|e| match e {
                    EncodeError::PadOverflow { length, actual } => RowError::PadOverflow {
                        column: plan.target.to_string(),
                        length,
                        actual,
                    },
                    EncodeError::Encoding(reason) => RowError::Encryption {
                        column: plan.target.to_string(),
                        reason,
                    },
                })?;
                let context = plan.target.as_str().as_bytes();
                let blob = seal_in_context(&self.seal_key, context, &envelope).map_err(|e| {
                    RowError::Encryption {
                        column: plan.target.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Value::Sealed(blob))
            }
        }
    }

    fn unseal_value(&self, plan: &ColumnPlan, value: &Value) -> Result<Value, RowError> {
        let column = || plan.source.to_string();
        let parsed;
        let blob = match value {
            Value::Sealed(blob) => blob,
            Value::Clear(Scalar::Text(text)) if text.starts_with(SEALED_PREFIX) => {
                parsed = Value::parse_encrypted_text(text).map_err(|e| RowError::Decoding {
                    column: column(),
                    reason: e.to_string(),
                })?;
                match &parsed {
                    Some(Value::Sealed(blob)) => blob,
                    _ => return Err(RowError::NotSealed { column: column() }),
                }
            }
            _ => return Err(RowError::NotSealed { column: column() }),
        };

        let envelope = unseal_in_context(&self.seal_key, plan.source.as_str().as_bytes(), blob)
            .map_err(|e| {
                if e.is_authentication() {
                    RowError::Authentication { column: column() }
                } else {
                    RowError::Decoding {
                        column: column(),
                        reason: e.to_string(),
                    }
                }
            })?;
        let scalar = codec::decode(&envelope).map_err(|reason| RowError::Decoding {
            column: column(),
            reason,
        })?;
        Ok(Value::Clear(scalar))
    }
}

/// Input position read by the `use_index`-th schema column naming `source`.
///
/// A name that appears once in the input may feed any number of columns.
/// A name that appears several times is bound by occurrence: the n-th
/// column reading it takes the n-th input column of that name.
fn bind_source(
    input_header: &TableHeader,
    source: &ColumnHeader,
    use_index: usize,
) -> EngineResult<usize> {
    match input_header.positions_of(source).as_slice() {
        [] => Err(EngineError::config(format!(
            "column {:?} is not present in the input",
            source.as_str()
        ))),
        [only] => Ok(*only),
        positions => positions.get(use_index).copied().ok_or_else(|| {
            EngineError::config(format!(
                "column {:?} appears {} times in the input but the schema reads it {} times",
                source.as_str(),
                positions.len(),
                use_index + 1
            ))
        }),
    }
}

fn plan_op(
    mode: Mode,
    column: &ColumnSpec,
    keys: &KeyMaterial,
    settings: &ClientSettings,
) -> EngineResult<Op> {
    Ok(match (mode, column.transform) {
        (_, TransformType::Cleartext) => Op::Copy,
        (Mode::Encrypt, TransformType::Fingerprint) => {
            Op::Fingerprint(fingerprint_key(column, keys, settings)?)
        }
        (Mode::Encrypt, TransformType::Sealed) => Op::Seal(column.pad),
        (Mode::Decrypt, TransformType::Sealed) => Op::Unseal,
        (Mode::Decrypt, TransformType::Fingerprint) => {
            return Err(EngineError::config(format!(
                "column {:?} is a fingerprint; fingerprints cannot be decrypted",
                column.source.as_str()
            )));
        }
    })
}

/// Key for one fingerprint column.
///
/// When joins across differently named columns are not allowed, each join
/// group (or each ungrouped column name) gets its own key, so only columns
/// meant to be joined yield comparable digests.
fn fingerprint_key(
    column: &ColumnSpec,
    keys: &KeyMaterial,
    settings: &ClientSettings,
) -> EngineResult<DerivedKey> {
    if settings.allow_joins_on_columns_with_different_names {
        return Ok(keys.fingerprint_key.clone());
    }
    let label = column
        .join_group
        .as_deref()
        .unwrap_or(column.target_header().as_str());
    keys.fingerprint_key
        .scoped(label)
        .map_err(EngineError::KeyDerivation)
}

/// The plaintext of a value about to be fingerprinted or sealed.
fn plaintext<'a>(plan: &ColumnPlan, value: &'a Value) -> Result<&'a Scalar, RowError> {
    let already = || RowError::AlreadyEncrypted {
        column: plan.source.to_string(),
    };
    match value {
        Value::Clear(Scalar::Text(text))
            if text.starts_with(FINGERPRINT_PREFIX) || text.starts_with(SEALED_PREFIX) =>
        {
            Err(already())
        }
        Value::Clear(scalar) => Ok(scalar),
        _ => Err(already()),
    }
}

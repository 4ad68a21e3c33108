//! Per-value transformation from donor values to patient literals.
//!
//! [`ValueCaster`] applies the length, range and precision rules of the
//! patient column. When a value does not fit, the [`CastPolicy`] decides
//! whether to repair it (truncate, clamp, substitute a default) or to report
//! a [`CastError`]. Every repair is logged.

mod dates;
mod policy;

pub use dates::parse_datetime;
pub use policy::{CastPolicy, DefaultValue, DefaultValueTable};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::warn;

use crate::core::{ColumnDescriptor, Literal, SqlValue};
use crate::typemap::{
    DateKind, DecimalSpec, IntegerRange, SemanticSubtype, TypeCatalog, TypeParameters,
};

/// Why a single value could not be written to its patient column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// NULL headed for a NOT NULL column and defaults are off.
    #[error("Target column {column} can't be NULL")]
    NullNotAllowed { column: String },

    /// Text longer than the column allows.
    #[error("Value is too long to insert into {column}: {length} characters, limit {max}")]
    ValueTooLong {
        column: String,
        length: usize,
        max: u64,
    },

    /// Number outside the range of the column type.
    #[error("Value {value} out of range for {column} ({raw_type})")]
    OutOfRange {
        column: String,
        value: String,
        raw_type: String,
    },

    /// Value headed for a numeric column is not a number.
    #[error("Value {value} can't be transformed to numeric type for {column}")]
    NotNumeric { column: String, value: String },

    /// Value headed for a temporal column is not a date.
    #[error("Value {value} can't be transformed to date type for {column}")]
    UnparseableDate { column: String, value: String },

    /// A fallback is needed but the defaults table has none for this type.
    #[error("No default value configured for {column} ({raw_type})")]
    MissingDefault { column: String, raw_type: String },

    /// The column type is outside the catalog.
    #[error("Type {raw_type} of {column} is not supported")]
    UnsupportedType { column: String, raw_type: String },
}

impl CastError {
    /// Patient column the error is about.
    pub fn column(&self) -> &str {
        match self {
            CastError::NullNotAllowed { column }
            | CastError::ValueTooLong { column, .. }
            | CastError::OutOfRange { column, .. }
            | CastError::NotNumeric { column, .. }
            | CastError::UnparseableDate { column, .. }
            | CastError::MissingDefault { column, .. }
            | CastError::UnsupportedType { column, .. } => column,
        }
    }
}

/// Converts donor values into literals for patient columns.
///
/// Holds only shared references to immutable configuration, so one caster
/// can serve every row and column of a run.
#[derive(Debug, Clone, Copy)]
pub struct ValueCaster<'a> {
    catalog: TypeCatalog,
    policy: &'a CastPolicy,
}

impl<'a> ValueCaster<'a> {
    pub fn new(catalog: TypeCatalog, policy: &'a CastPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &CastPolicy {
        self.policy
    }

    /// Cast a donor value into `target`, whose type differs from `source`.
    pub fn cast(
        &self,
        value: &SqlValue,
        target: &ColumnDescriptor,
        source: &ColumnDescriptor,
    ) -> Result<Literal, CastError> {
        let subtype = self.catalog.classify(&target.raw_type);

        if value.is_null() && subtype != SemanticSubtype::Date {
            if target.nullable {
                return Ok(Literal::Null);
            }
            if !self.policy.default_on_null {
                return Err(CastError::NullNotAllowed {
                    column: target.name.clone(),
                });
            }
            let literal = self.default_literal(target, subtype)?;
            warn!(
                "NULL from {} replaced with default {} for {}",
                source.name, literal, target.name
            );
            return Ok(literal);
        }

        match self.catalog.parameters(&target.raw_type) {
            TypeParameters::String { max_chars } => self.cast_string(value, max_chars, target),
            TypeParameters::Numeric(range) => self.cast_numeric(value, range, target),
            TypeParameters::Float(spec) => self.cast_float(value, spec, target),
            TypeParameters::Date(kind) => self.cast_date(value, kind, target),
            TypeParameters::Unknown => Err(CastError::UnsupportedType {
                column: target.name.clone(),
                raw_type: target.raw_type.clone(),
            }),
        }
    }

    /// Literal for a value whose donor column has the same type as `target`.
    ///
    /// No range or length checks are applied; the value is only quoted the
    /// way the target subtype expects. NULLs go through
    /// [`ValueCaster::undefined_column_value`].
    pub fn prepare(&self, value: &SqlValue, target: &ColumnDescriptor) -> Result<Literal, CastError> {
        if value.is_null() {
            return self.undefined_column_value(target);
        }

        if let SqlValue::Bytes(bytes) = value {
            if std::str::from_utf8(bytes).is_err() {
                return Ok(Literal::bare(hex_literal(bytes)));
            }
        }

        let text = value.as_text().unwrap_or_default().into_owned();
        let literal = match self.catalog.classify(&target.raw_type) {
            SemanticSubtype::Numeric | SemanticSubtype::Float if value.as_decimal().is_some() => {
                Literal::Bare(text.trim().to_string())
            }
            _ => Literal::Quoted(text),
        };
        Ok(literal)
    }

    /// Value for a patient column that no donor column feeds, or a NULL from
    /// a same-typed donor column.
    ///
    /// Nullable columns get NULL; NOT NULL columns get the configured default
    /// for their type, or [`CastError::NullNotAllowed`] when defaults are off.
    pub fn undefined_column_value(&self, target: &ColumnDescriptor) -> Result<Literal, CastError> {
        if target.nullable {
            return Ok(Literal::Null);
        }
        if !self.policy.default_on_null {
            return Err(CastError::NullNotAllowed {
                column: target.name.clone(),
            });
        }
        let subtype = self.catalog.classify(&target.raw_type);
        self.default_literal(target, subtype)
    }

    /// Configured default for the target type, formatted for its subtype.
    fn default_literal(
        &self,
        target: &ColumnDescriptor,
        subtype: SemanticSubtype,
    ) -> Result<Literal, CastError> {
        if subtype == SemanticSubtype::Date {
            let kind = crate::typemap::date_kind(&target.raw_type);
            return self.date_default(target, kind);
        }

        let default = self
            .policy
            .defaults
            .lookup(&target.raw_type, subtype)
            .ok_or_else(|| CastError::MissingDefault {
                column: target.name.clone(),
                raw_type: target.raw_type.clone(),
            })?;

        match subtype {
            SemanticSubtype::Numeric | SemanticSubtype::Float => match default {
                DefaultValue::Int(v) => Ok(Literal::bare(v)),
                DefaultValue::Float(v) => Ok(Literal::bare(v)),
                DefaultValue::Text(text) => match SqlValue::from(text.as_str()).as_decimal() {
                    Some(number) => Ok(Literal::bare(number)),
                    None => Err(CastError::NotNumeric {
                        column: target.name.clone(),
                        value: text.clone(),
                    }),
                },
            },
            _ => Ok(Literal::Quoted(default.to_string())),
        }
    }

    /// Default for a temporal column: the configured value parsed and
    /// reformatted, or the reference time when none is configured.
    fn date_default(&self, target: &ColumnDescriptor, kind: DateKind) -> Result<Literal, CastError> {
        let reference = self.policy.defaults.reference_time();
        let instant = match self
            .policy
            .defaults
            .lookup(&target.raw_type, SemanticSubtype::Date)
        {
            Some(default) => {
                let value = match default {
                    DefaultValue::Int(v) => SqlValue::Int(*v),
                    other => SqlValue::Text(other.to_string()),
                };
                parse_datetime(&value, reference).ok_or_else(|| CastError::UnparseableDate {
                    column: target.name.clone(),
                    value: default.to_string(),
                })?
            }
            None => reference,
        };
        Ok(Literal::Quoted(instant.format(kind.format()).to_string()))
    }

    fn cast_string(
        &self,
        value: &SqlValue,
        max_chars: u64,
        target: &ColumnDescriptor,
    ) -> Result<Literal, CastError> {
        let text = value.as_text().unwrap_or_default();
        let length = text.chars().count();

        if length as u64 <= max_chars {
            return Ok(Literal::Quoted(text.into_owned()));
        }

        if !self.policy.allow_lossy_transform {
            return Err(CastError::ValueTooLong {
                column: target.name.clone(),
                length,
                max: max_chars,
            });
        }

        warn!(
            "Truncating value for {} from {} to {} characters",
            target.name, length, max_chars
        );
        let truncated: String = text.chars().take(max_chars as usize).collect();
        Ok(Literal::Quoted(truncated))
    }

    fn cast_numeric(
        &self,
        value: &SqlValue,
        range: IntegerRange,
        target: &ColumnDescriptor,
    ) -> Result<Literal, CastError> {
        let number = match value.as_decimal() {
            Some(number) if range.contains(number) => number,
            Some(number) => {
                return self.out_of_range(value, target, integer_clamp(range, number > Decimal::ZERO))
            }
            None => match value.as_f64() {
                Some(f) => return self.out_of_range(value, target, integer_clamp(range, f > 0.0)),
                None => {
                    return Err(CastError::NotNumeric {
                        column: target.name.clone(),
                        value: value.to_string(),
                    })
                }
            },
        };

        let rounded = number.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        match rounded.to_i64() {
            Some(v) => Ok(Literal::bare(v)),
            None => self.out_of_range(value, target, integer_clamp(range, rounded > Decimal::ZERO)),
        }
    }

    fn cast_float(
        &self,
        value: &SqlValue,
        spec: DecimalSpec,
        target: &ColumnDescriptor,
    ) -> Result<Literal, CastError> {
        if let Some(number) = value.as_decimal() {
            let rounded =
                number.round_dp_with_strategy(spec.scale(), RoundingStrategy::MidpointAwayFromZero);

            let (in_range, above) = match spec.bound() {
                Some(upper) => {
                    let lower = if spec.unsigned { Decimal::ZERO } else { -upper };
                    (lower <= rounded && rounded <= upper, rounded > upper)
                }
                None => {
                    let f = rounded.to_f64().unwrap_or_default();
                    (
                        spec.float_lower_bound() <= f && f <= spec.float_bound(),
                        f > spec.float_bound(),
                    )
                }
            };

            if in_range {
                return Ok(Literal::bare(rounded));
            }
            return self.out_of_range(value, target, decimal_clamp(&spec, above));
        }

        match value.as_f64() {
            Some(f) if spec.float_lower_bound() <= f && f <= spec.float_bound() => {
                Ok(Literal::bare(f))
            }
            Some(f) => self.out_of_range(value, target, decimal_clamp(&spec, f > 0.0)),
            None => Err(CastError::NotNumeric {
                column: target.name.clone(),
                value: value.to_string(),
            }),
        }
    }

    fn cast_date(
        &self,
        value: &SqlValue,
        kind: DateKind,
        target: &ColumnDescriptor,
    ) -> Result<Literal, CastError> {
        if value.is_null() {
            if !target.nullable && !self.policy.default_on_null {
                return Err(CastError::NullNotAllowed {
                    column: target.name.clone(),
                });
            }
            return self.date_default(target, kind);
        }

        let reference = self.policy.defaults.reference_time();
        match parse_datetime(value, reference) {
            Some(instant) => Ok(Literal::Quoted(instant.format(kind.format()).to_string())),
            None if self.policy.allow_lossy_transform => {
                let literal = self.date_default(target, kind)?;
                warn!(
                    "Value {} for {} is not a date, using default {}",
                    value, target.name, literal
                );
                Ok(literal)
            }
            None => Err(CastError::UnparseableDate {
                column: target.name.clone(),
                value: value.to_string(),
            }),
        }
    }

    /// Reject an out-of-range value, or clamp it when lossy casts are allowed.
    fn out_of_range(
        &self,
        value: &SqlValue,
        target: &ColumnDescriptor,
        clamped: String,
    ) -> Result<Literal, CastError> {
        if !self.policy.allow_lossy_transform {
            return Err(CastError::OutOfRange {
                column: target.name.clone(),
                value: value.to_string(),
                raw_type: target.raw_type.clone(),
            });
        }
        warn!(
            "Value {} out of range for {} ({}), clamped to {}",
            value, target.name, target.raw_type, clamped
        );
        Ok(Literal::Bare(clamped))
    }
}

/// Clamp target for an out-of-range integer.
///
/// Unsigned columns clamp to their maximum (or zero from below). Signed
/// columns clamp to zero, not to the nearer bound.
fn integer_clamp(range: IntegerRange, above: bool) -> String {
    match range {
        IntegerRange::Unsigned { max } if above => max.to_string(),
        _ => "0".to_string(),
    }
}

/// Clamp target for an out-of-range fractional value, same rule as integers.
fn decimal_clamp(spec: &DecimalSpec, above: bool) -> String {
    if spec.unsigned && above {
        match spec.bound() {
            Some(bound) => bound.to_string(),
            None => spec.float_bound().to_string(),
        }
    } else {
        "0".to_string()
    }
}

fn hex_literal(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    format!("X'{}'", hex)
}

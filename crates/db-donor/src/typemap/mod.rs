//! Type classification and compatibility rules for MySQL column types.

pub mod catalog;
pub mod compat;

pub use catalog::{
    date_kind, decimal_params, numeric_params, string_params, strip_brackets, type_keyword,
    DateKind, DecimalKind, DecimalSpec, IntegerKind, IntegerRange, Precision, SemanticSubtype,
    TypeCatalog, TypeParameters,
};
pub use compat::{is_datetime_pair, CompatibilityChecker};

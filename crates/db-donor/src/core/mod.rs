//! Core abstractions shared by the casting engine and the database drivers.
//!
//! - [`schema`]: column and table metadata
//! - [`relations`]: which donor column feeds which patient column
//! - [`value`]: donor values and patient literals
//! - [`traits`]: reader/writer traits implemented by drivers

pub mod relations;
pub mod schema;
pub mod traits;
pub mod value;

pub use relations::ColumnRelationMap;
pub use schema::{ColumnDescriptor, TableSchema};
pub use traits::{DonorReader, PatientWriter};
pub use value::{Literal, Row, SqlValue};

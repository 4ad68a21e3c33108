//! # db-donor
//!
//! Copy rows from a "donor" MySQL table into a "patient" table whose columns,
//! types and constraints differ.
//!
//! The library provides:
//!
//! - **Type catalog**: classifies MySQL column types and derives length,
//!   range, precision and date format
//! - **Compatibility rules**: which donor types may feed which patient types
//! - **Pre-flight check**: every patient column is validated before a row moves
//! - **Value casting**: truncation, clamping, rounding and default values,
//!   each controlled by the casting policy
//! - **Transfer**: one logged INSERT per donor row
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_donor::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("db-donor.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run(false).await?;
//!     println!("Inserted {} rows", result.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod cast;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod preflight;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use cast::{CastError, CastPolicy, DefaultValue, DefaultValueTable, ValueCaster};
pub use config::{Config, DatabaseConfig, Settings};
pub use crate::core::{
    ColumnDescriptor, ColumnRelationMap, DonorReader, Literal, PatientWriter, Row, SqlValue,
    TableSchema,
};
pub use drivers::MysqlTable;
pub use error::{DonorError, Result, SchemaIssue};
pub use orchestrator::{check_with, run_with, MigrationResult, Orchestrator, RunSpec};
pub use preflight::{CastPlan, ResolvedRelation, SchemaComparator};
pub use transfer::{render_insert, TransferEngine, TransferStats, STATEMENT_TARGET};
pub use typemap::{CompatibilityChecker, SemanticSubtype, TypeCatalog};

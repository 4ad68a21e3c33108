//! Collaborator traits for reading the donor table and writing the patient table.
//!
//! - [`DonorReader`]: describes the donor table and reads all of its rows
//! - [`PatientWriter`]: describes the patient table and executes INSERT statements
//!
//! The casting core never talks to a database directly; the orchestrator and
//! the transfer engine only see these traits, so tests can drive the whole
//! pipeline with in-memory implementations.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::TableSchema;
use super::value::Row;

/// Read schema and data from the donor database.
#[async_trait]
pub trait DonorReader: Send + Sync {
    /// Describe a table: columns in ordinal order with their raw types.
    async fn describe(&self, table: &str) -> Result<TableSchema>;

    /// Read every row of a table.
    ///
    /// Rows are fully materialized; the schema is passed so implementations
    /// can decode each column by its declared type.
    async fn fetch_all_rows(&self, schema: &TableSchema) -> Result<Vec<Row>>;
}

/// Write data to the patient database.
#[async_trait]
pub trait PatientWriter: Send + Sync {
    /// Describe a table: columns in ordinal order with their raw types.
    async fn describe(&self, table: &str) -> Result<TableSchema>;

    /// Execute one fully rendered INSERT statement.
    async fn execute(&self, statement: &str) -> Result<u64>;
}

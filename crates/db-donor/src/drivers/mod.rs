//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB tables, used for both the donor and the patient side

pub mod mysql;

pub use mysql::MysqlTable;

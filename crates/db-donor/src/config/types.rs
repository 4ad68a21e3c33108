//! Configuration type definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cast::DefaultValue;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database and table rows are read from.
    pub donor: DatabaseConfig,

    /// Database and table rows are written to.
    pub patient: DatabaseConfig,

    /// Patient column name → donor column name.
    #[serde(default)]
    pub columns_relations: BTreeMap<String, String>,

    /// Migration behavior flags.
    #[serde(default)]
    pub settings: Settings,

    /// Fallback values keyed by type name (`VARCHAR`, `INT UNSIGNED`,
    /// `DECIMAL(2,1)`) or subtype name (`NUMERIC`, `DATE`).
    #[serde(default)]
    pub defaults: BTreeMap<String, DefaultValue>,
}

/// Connection and table settings for one side of the migration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database (schema) name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Table name.
    pub table: String,

    /// SSL mode: disabled, preferred, required, verify_ca, verify_identity
    /// (default: preferred).
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// Maximum pool connections (default: 2).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("table", &self.table)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Migration behavior flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Abort on the first rejected value or failed insert (default: false).
    #[serde(default)]
    pub stop_on_failure: bool,

    /// Leave AUTO_INCREMENT patient columns to the database (default: true).
    #[serde(default = "default_true")]
    pub auto_increment: bool,

    /// Allow related columns with different types (default: true).
    #[serde(default = "default_true")]
    pub transform_types: bool,

    /// Allow lossy transforms: truncation, clamping, integer/fraction and
    /// TIME/YEAR casts (default: false).
    #[serde(default)]
    pub transform_all: bool,

    /// Replace NULLs headed for NOT NULL columns with defaults (default: true).
    #[serde(default = "default_true")]
    pub default_null_values: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            auto_increment: true,
            transform_types: true,
            transform_all: false,
            default_null_values: true,
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_ssl_mode() -> String {
    "preferred".to_string()
}

fn default_max_connections() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

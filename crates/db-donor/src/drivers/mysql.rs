//! MySQL/MariaDB driver.
//!
//! [`MysqlTable`] implements both [`DonorReader`] and [`PatientWriter`] on top
//! of an SQLx connection pool. Column types are read from
//! `INFORMATION_SCHEMA.COLUMNS.COLUMN_TYPE`, so the raw type keeps its length,
//! precision and `unsigned` attribute.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Row as _, ValueRef};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::core::{ColumnDescriptor, DonorReader, PatientWriter, Row, SqlValue, TableSchema};
use crate::error::{DonorError, Result};
use crate::transfer::quote_ident;
use crate::typemap::type_keyword;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

const DESCRIBE_QUERY: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
        IF(IS_NULLABLE = 'YES', 1, 0) AS is_nullable,
        IF(EXTRA LIKE '%auto_increment%', 1, 0) AS is_identity
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

/// A MySQL database reached through an SQLx pool.
pub struct MysqlTable {
    pool: MySqlPool,
    database: String,
}

impl MysqlTable {
    /// Connect using one side of the configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let ssl_mode = Self::ssl_mode(&config.ssl_mode)?;
        if matches!(ssl_mode, MySqlSslMode::Disabled) {
            warn!(
                "MySQL TLS is disabled for {}. Credentials will be transmitted in plaintext.",
                config.host
            );
        }

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .charset("utf8mb4")
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| DonorError::pool(e, format!("connecting to {}", config.host)))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| DonorError::pool(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    fn ssl_mode(mode: &str) -> Result<MySqlSslMode> {
        MySqlSslMode::from_str(&mode.to_lowercase())
            .map_err(|e| DonorError::Config(format!("invalid ssl_mode '{}': {}", mode, e)))
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema> {
        let rows: Vec<MySqlRow> = sqlx::query(DESCRIBE_QUERY)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DonorError::pool(e, format!("describing table {}", table)))?;

        if rows.is_empty() {
            return Err(DonorError::Config(format!(
                "table {} does not exist in {}",
                table, self.database
            )));
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnDescriptor {
                name: row.try_get::<String, _>("COLUMN_NAME")?,
                raw_type: row.try_get::<String, _>("COLUMN_TYPE")?,
                nullable: row.try_get::<i64, _>("is_nullable")? == 1,
                is_auto_increment: row.try_get::<i64, _>("is_identity")? == 1,
            });
        }

        debug!("Described {}.{}: {} columns", self.database, table, columns.len());
        Ok(TableSchema::new(table, columns))
    }

    /// Convert a MySQL row to a [`Row`] keyed by column name.
    fn row_to_values(row: &MySqlRow, columns: &[ColumnDescriptor]) -> Row {
        columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.clone(), Self::column_value(row, i, &col.raw_type)))
            .collect()
    }

    fn column_value(row: &MySqlRow, i: usize, raw_type: &str) -> SqlValue {
        let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
        if is_null {
            return SqlValue::Null;
        }

        let keyword = type_keyword(raw_type).to_lowercase();
        let value = match keyword.as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => row
                .try_get::<i64, _>(i)
                .map(SqlValue::Int)
                .or_else(|_| row.try_get::<u64, _>(i).map(SqlValue::UInt))
                .ok(),

            "float" => row
                .try_get::<f32, _>(i)
                .ok()
                .and_then(|v| Decimal::from_str(&v.to_string()).ok())
                .map(SqlValue::Decimal),
            "double" | "real" => row.try_get::<f64, _>(i).map(SqlValue::Float).ok(),
            "decimal" | "numeric" => row.try_get::<Decimal, _>(i).map(SqlValue::Decimal).ok(),

            "bit" | "bool" | "boolean" => row
                .try_get::<bool, _>(i)
                .map(|b| SqlValue::Int(b as i64))
                .ok(),

            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
                row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok()
            }

            "date" => row.try_get::<chrono::NaiveDate, _>(i).map(SqlValue::Date).ok(),
            "time" => row.try_get::<chrono::NaiveTime, _>(i).map(SqlValue::Time).ok(),
            "datetime" | "timestamp" => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .map(SqlValue::DateTime)
                .ok(),

            _ => None,
        };

        value
            .or_else(|| row.try_get::<String, _>(i).map(SqlValue::Text).ok())
            .or_else(|| row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok())
            .unwrap_or_else(|| {
                warn!("Can't decode value of type {} in column {}, reading NULL", raw_type, i);
                SqlValue::Null
            })
    }
}

#[async_trait]
impl DonorReader for MysqlTable {
    async fn describe(&self, table: &str) -> Result<TableSchema> {
        self.describe_table(table).await
    }

    async fn fetch_all_rows(&self, schema: &TableSchema) -> Result<Vec<Row>> {
        let columns = schema
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!("SELECT {} FROM {}", columns, quote_ident(&schema.name));

        let rows: Vec<MySqlRow> = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DonorError::pool(e, format!("reading table {}", schema.name)))?;

        info!("Read {} rows from {}.{}", rows.len(), self.database, schema.name);
        Ok(rows
            .iter()
            .map(|row| Self::row_to_values(row, &schema.columns))
            .collect())
    }
}

#[async_trait]
impl PatientWriter for MysqlTable {
    async fn describe(&self, table: &str) -> Result<TableSchema> {
        self.describe_table(table).await
    }

    async fn execute(&self, statement: &str) -> Result<u64> {
        let result = sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| DonorError::pool(e, "executing insert"))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_names() {
        assert!(matches!(
            MysqlTable::ssl_mode("disabled"),
            Ok(MySqlSslMode::Disabled)
        ));
        assert!(matches!(
            MysqlTable::ssl_mode("PREFERRED"),
            Ok(MySqlSslMode::Preferred)
        ));
        assert!(matches!(
            MysqlTable::ssl_mode("verify_identity"),
            Ok(MySqlSslMode::VerifyIdentity)
        ));
        assert!(matches!(
            MysqlTable::ssl_mode("sometimes"),
            Err(DonorError::Config(_))
        ));
    }
}

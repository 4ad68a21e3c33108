//! Configuration validation.

use super::{Config, DatabaseConfig};
use crate::error::{DonorError, Result};

const SSL_MODES: &[&str] = &[
    "disabled",
    "preferred",
    "required",
    "verify_ca",
    "verify_identity",
];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_database("donor", &config.donor)?;
    validate_database("patient", &config.patient)?;

    // Cannot read from and write to the same table
    if config.donor.host == config.patient.host
        && config.donor.port == config.patient.port
        && config.donor.database == config.patient.database
        && config.donor.table.eq_ignore_ascii_case(&config.patient.table)
    {
        return Err(DonorError::Config(
            "donor and patient cannot be the same table".into(),
        ));
    }

    for (target, source) in &config.columns_relations {
        if target.trim().is_empty() {
            return Err(DonorError::Config(
                "columns_relations contains an empty patient column name".into(),
            ));
        }
        if source.trim().is_empty() {
            return Err(DonorError::Config(format!(
                "columns_relations.{} has an empty donor column name",
                target
            )));
        }
    }

    Ok(())
}

fn validate_database(side: &str, db: &DatabaseConfig) -> Result<()> {
    for (field, value) in [
        ("host", &db.host),
        ("database", &db.database),
        ("user", &db.user),
        ("table", &db.table),
    ] {
        if value.trim().is_empty() {
            return Err(DonorError::Config(format!("{}.{} is required", side, field)));
        }
    }

    if !SSL_MODES.contains(&db.ssl_mode.to_lowercase().as_str()) {
        return Err(DonorError::Config(format!(
            "{}.ssl_mode must be one of {}, got '{}'",
            side,
            SSL_MODES.join(", "),
            db.ssl_mode
        )));
    }

    if db.max_connections == 0 {
        return Err(DonorError::Config(format!(
            "{}.max_connections must be at least 1",
            side
        )));
    }

    Ok(())
}

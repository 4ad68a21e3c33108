//! Error types for the migration library.

use std::fmt;

use thiserror::Error;

use crate::cast::CastError;

/// Main error type for migration operations.
///
/// These are the fatal conditions. Value-level problems are reported as
/// [`CastError`] first and only become a `DonorError` when the failure policy
/// says the run must stop.
#[derive(Error, Debug)]
pub enum DonorError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Query failed against the donor or patient database
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Pre-flight comparison found columns that cannot be filled.
    #[error("Incompatible column types: {}", SchemaIssue::summary(.issues))]
    SchemaIncompatible { issues: Vec<SchemaIssue> },

    /// A value could not be cast and the run is configured to stop on failure.
    #[error("Can't transform value: {0}")]
    Cast(#[from] CastError),

    /// Row transfer failed for a table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One reason the pre-flight gate refused a patient column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    /// Required column with no donor column mapped to it.
    NoRelationForRequiredColumn { column: String },

    /// Both types are known but the policy does not allow the cast.
    IncompatibleTypes {
        target_column: String,
        source_column: String,
        target_type: String,
        source_type: String,
    },

    /// Types differ and `transform_types` is off.
    TransformDisabled {
        target_column: String,
        source_column: String,
        target_type: String,
        source_type: String,
    },

    /// The relation points at a donor column that does not exist.
    MissingSourceColumn {
        target_column: String,
        source_column: String,
    },

    /// The relation is keyed by a column the patient table does not have.
    UnknownTargetColumn { column: String },
}

impl SchemaIssue {
    /// Patient column this issue is about.
    pub fn column(&self) -> &str {
        match self {
            SchemaIssue::NoRelationForRequiredColumn { column }
            | SchemaIssue::UnknownTargetColumn { column } => column,
            SchemaIssue::IncompatibleTypes { target_column, .. }
            | SchemaIssue::TransformDisabled { target_column, .. }
            | SchemaIssue::MissingSourceColumn { target_column, .. } => target_column,
        }
    }

    fn summary(issues: &[SchemaIssue]) -> String {
        issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::NoRelationForRequiredColumn { column } => {
                write!(f, "column {} is NOT NULL but has no donor column", column)
            }
            SchemaIssue::IncompatibleTypes {
                target_column,
                source_column,
                target_type,
                source_type,
            } => write!(
                f,
                "{} ({}) can't be filled from {} ({})",
                target_column, target_type, source_column, source_type
            ),
            SchemaIssue::TransformDisabled {
                target_column,
                source_column,
                target_type,
                source_type,
            } => write!(
                f,
                "{} ({}) differs from {} ({}) and transform_types is off",
                target_column, target_type, source_column, source_type
            ),
            SchemaIssue::MissingSourceColumn {
                target_column,
                source_column,
            } => write!(
                f,
                "{} is related to donor column {} which does not exist",
                target_column, source_column
            ),
            SchemaIssue::UnknownTargetColumn { column } => {
                write!(f, "relation key {} is not a patient column", column)
            }
        }
    }
}

impl DonorError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl fmt::Display, context: impl Into<String>) -> Self {
        DonorError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        DonorError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Pre-flight issues carried by this error, if any.
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            DonorError::SchemaIncompatible { issues } => issues,
            _ => &[],
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            DonorError::Config(_) | DonorError::Yaml(_) => 2,
            DonorError::SchemaIncompatible { .. } => 3,
            DonorError::Cast(_) | DonorError::Transfer { .. } => 4,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        for issue in self.issues() {
            output.push_str(&format!("  - {}\n", issue));
        }

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, DonorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_incompatible_lists_every_issue() {
        let err = DonorError::SchemaIncompatible {
            issues: vec![
                SchemaIssue::NoRelationForRequiredColumn {
                    column: "id_client".into(),
                },
                SchemaIssue::IncompatibleTypes {
                    target_column: "amount".into(),
                    source_column: "AMOUNT".into(),
                    target_type: "int".into(),
                    source_type: "decimal(7,4)".into(),
                },
            ],
        };

        let text = err.to_string();
        assert!(text.contains("id_client"));
        assert!(text.contains("decimal(7,4)"));
        assert_eq!(err.issues().len(), 2);
        assert_eq!(err.issues()[1].column(), "amount");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_format_detailed_includes_issue_lines() {
        let err = DonorError::SchemaIncompatible {
            issues: vec![SchemaIssue::UnknownTargetColumn {
                column: "ghost".into(),
            }],
        };
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: "));
        assert!(detailed.contains("  - relation key ghost is not a patient column"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DonorError::Config("x".into()).exit_code(), 2);
        assert_eq!(DonorError::transfer("t", "boom").exit_code(), 4);
        assert_eq!(DonorError::pool("refused", "connecting").exit_code(), 1);
    }
}

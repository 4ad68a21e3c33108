//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use chrono::NaiveDateTime;

use crate::cast::{CastPolicy, DefaultValueTable};
use crate::core::ColumnRelationMap;
use crate::error::Result;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Casting policy for a run that starts at `reference_time`.
    pub fn cast_policy(&self, reference_time: NaiveDateTime) -> CastPolicy {
        let defaults = DefaultValueTable::from_entries(
            self.defaults
                .iter()
                .map(|(key, value)| (key.as_str(), value.clone())),
            reference_time,
        );
        CastPolicy {
            stop_on_failure: self.settings.stop_on_failure,
            allow_type_transform: self.settings.transform_types,
            allow_lossy_transform: self.settings.transform_all,
            default_on_null: self.settings.default_null_values,
            skip_auto_increment: self.settings.auto_increment,
            defaults,
        }
    }

    /// Column relations as configured.
    pub fn relations(&self) -> ColumnRelationMap {
        self.columns_relations
            .iter()
            .map(|(target, source)| (target.trim(), source.trim()))
            .collect()
    }

    /// Commented starter configuration, as written by `db-donor init`.
    pub fn template() -> &'static str {
        TEMPLATE
    }
}

impl DatabaseConfig {
    /// `database.table`, for log messages.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

const TEMPLATE: &str = r#"# db-donor configuration

donor:
  host: localhost
  port: 3306
  database: legacy
  user: root
  password: ""
  table: clients

patient:
  host: localhost
  port: 3306
  database: shop
  user: root
  password: ""
  table: customers
  ssl_mode: preferred

# patient column: donor column
columns_relations:
  name: FULL_NAME
  email: EMAIL
  created_at: CREATED

settings:
  stop_on_failure: false
  auto_increment: true
  transform_types: true
  transform_all: false
  default_null_values: true

# fallback values by type name (VARCHAR, INT UNSIGNED, DECIMAL(2,1))
# or by kind (STRING, NUMERIC, FLOAT, DATE)
defaults:
  VARCHAR: undefined
  CHAR: undefined
  TEXT: ""
  INT: 0
  TINYINT: 0
  DECIMAL: 0
  FLOAT: 0
  DATE: "1970-01-01"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::DefaultValue;
    use chrono::NaiveDate;
    use std::io::Write;

    const YAML: &str = r#"
donor:
  host: db1
  database: legacy
  user: reader
  password: p@ss word
  table: clients
patient:
  host: db2
  port: 3307
  database: shop
  user: writer
  password: secret
  table: customers
columns_relations:
  name: FULL_NAME
  id_client: ID
settings:
  transform_all: true
defaults:
  varchar: undefined
  INT: 0
  DECIMAL(2,1): 0.5
"#;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.donor.port, 3306);
        assert_eq!(config.patient.port, 3307);
        assert_eq!(config.donor.ssl_mode, "preferred");
        assert_eq!(config.columns_relations.len(), 2);
        assert!(config.settings.transform_all);
        assert!(config.settings.auto_increment);
        assert!(config.settings.default_null_values);
        assert_eq!(config.defaults["INT"], DefaultValue::Int(0));
    }

    #[test]
    fn test_cast_policy_from_settings() {
        let config = Config::from_yaml(YAML).unwrap();
        let policy = config.cast_policy(reference());
        assert!(policy.allow_lossy_transform);
        assert!(policy.allow_type_transform);
        assert!(!policy.stop_on_failure);
        assert_eq!(policy.defaults.len(), 3);
        assert_eq!(policy.defaults.reference_time(), reference());
        assert_eq!(
            policy
                .defaults
                .lookup("varchar(10)", crate::typemap::SemanticSubtype::String),
            Some(&DefaultValue::Text("undefined".into()))
        );
    }

    #[test]
    fn test_relations() {
        let config = Config::from_yaml(YAML).unwrap();
        let relations = config.relations();
        assert_eq!(relations.source_for("name"), Some("FULL_NAME"));
        assert_eq!(relations.source_for("id_client"), Some("ID"));
        assert_eq!(relations.source_for("email"), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.patient.table, "customers");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/db-donor.yaml").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_template_is_valid() {
        let config = Config::from_yaml(Config::template()).unwrap();
        assert_eq!(config.donor.table, "clients");
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_qualified_table() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.patient.qualified_table(), "shop.customers");
        assert_eq!(config.donor.password, "p@ss word");
    }
}

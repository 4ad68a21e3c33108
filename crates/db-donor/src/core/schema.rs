//! Column and table metadata as reported by schema introspection.

use serde::{Deserialize, Serialize};

/// One column of a donor or patient table.
///
/// `raw_type` is kept exactly as the server reports it (`decimal(7,4)`,
/// `int unsigned`, `varchar(80)`); everything the caster needs is derived
/// from it on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Full column type string.
    pub raw_type: String,

    /// Whether the column accepts NULL.
    pub nullable: bool,

    /// Whether the column is filled by AUTO_INCREMENT.
    pub is_auto_increment: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            nullable: false,
            is_auto_increment: false,
        }
    }

    /// Mark the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the column as AUTO_INCREMENT.
    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    /// Check whether the column may be left out of an INSERT.
    ///
    /// Nullable columns and auto-increment columns are filled by the server.
    pub fn can_be_omitted(&self) -> bool {
        self.nullable || self.is_auto_increment
    }
}

/// Table metadata: name plus columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Column definitions, in ordinal order.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name.
    ///
    /// An exact match wins; otherwise the comparison is ASCII case-insensitive,
    /// matching MySQL's handling of column identifiers.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// Check if the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoices() -> TableSchema {
        TableSchema::new(
            "INVFILE",
            vec![
                ColumnDescriptor::new("ID", "int").auto_increment(),
                ColumnDescriptor::new("F_POHT", "decimal(7,4)"),
                ColumnDescriptor::new("f_poht", "decimal(9,2)").nullable(),
            ],
        )
    }

    #[test]
    fn test_column_lookup_prefers_exact_name() {
        let table = invoices();
        assert_eq!(table.column("f_poht").unwrap().raw_type, "decimal(9,2)");
        assert_eq!(table.column("F_POHT").unwrap().raw_type, "decimal(7,4)");
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = invoices();
        assert_eq!(table.column("id").unwrap().name, "ID");
        assert!(!table.has_column("F_POTTC"));
    }

    #[test]
    fn test_can_be_omitted() {
        let table = invoices();
        assert!(table.columns[0].can_be_omitted());
        assert!(!table.columns[1].can_be_omitted());
        assert!(table.columns[2].can_be_omitted());
    }
}

//! Row transfer from the donor table into the patient table.
//!
//! The engine turns each donor row into `(column, literal)` pairs, renders a
//! single-row INSERT from them and hands it to a [`PatientWriter`]. Which
//! action applies to which patient column is decided once, when the engine is
//! built; per row only the values change.

use tracing::{debug, error, info, warn};

use crate::cast::{CastError, CastPolicy, ValueCaster};
use crate::core::{ColumnDescriptor, Literal, PatientWriter, Row, SqlValue, TableSchema};
use crate::error::{DonorError, Result};
use crate::preflight::CastPlan;
use crate::typemap::TypeCatalog;

/// Tracing target of the statement audit log.
pub const STATEMENT_TARGET: &str = "db_donor::statements";

/// Counters for one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Donor rows read.
    pub rows_read: u64,

    /// Rows the patient database accepted.
    pub rows_inserted: u64,

    /// Rows whose INSERT failed.
    pub rows_failed: u64,

    /// Rows left with no value at all.
    pub rows_skipped: u64,

    /// INSERT statements built (executed or not).
    pub statements_built: u64,

    /// Values that went through a cast.
    pub values_cast: u64,

    /// Values dropped from their row because they could not be cast.
    pub values_rejected: u64,
}

/// What to do with one patient column, per row.
#[derive(Debug, Clone)]
enum ColumnAction {
    /// Leave the column out of the INSERT.
    Omit,
    /// No donor column: fill with the configured default or NULL.
    Undefined,
    /// Donor type differs: cast the value.
    Cast(ColumnDescriptor),
    /// Donor type matches: quote the value as is.
    Prepare(ColumnDescriptor),
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    target: ColumnDescriptor,
    action: ColumnAction,
}

/// Builds and executes the INSERT statements of one migration.
pub struct TransferEngine<'a> {
    table: String,
    columns: Vec<ColumnPlan>,
    caster: ValueCaster<'a>,
    policy: &'a CastPolicy,
    dry_run: bool,
}

impl<'a> TransferEngine<'a> {
    /// Create an engine for `target` from a checked cast plan.
    pub fn new(
        target: &TableSchema,
        plan: &CastPlan,
        catalog: TypeCatalog,
        policy: &'a CastPolicy,
    ) -> Self {
        let columns = target
            .columns
            .iter()
            .map(|column| ColumnPlan {
                target: column.clone(),
                action: Self::action_for(column, plan, policy),
            })
            .collect();

        Self {
            table: target.name.clone(),
            columns,
            caster: ValueCaster::new(catalog, policy),
            policy,
            dry_run: false,
        }
    }

    /// Build and log statements without executing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn action_for(column: &ColumnDescriptor, plan: &CastPlan, policy: &CastPolicy) -> ColumnAction {
        if column.is_auto_increment && policy.skip_auto_increment {
            return ColumnAction::Omit;
        }
        match plan.source_for(&column.name) {
            Some(source) if plan.needs_cast(&column.name) => ColumnAction::Cast(source.clone()),
            Some(source) => ColumnAction::Prepare(source.clone()),
            None if column.can_be_omitted() => ColumnAction::Omit,
            None => ColumnAction::Undefined,
        }
    }

    /// Transfer every donor row, one INSERT per row.
    pub async fn run<W>(&self, rows: &[Row], writer: &W) -> Result<TransferStats>
    where
        W: PatientWriter + ?Sized,
    {
        if rows.is_empty() {
            return Err(DonorError::transfer(&self.table, "no data in donor table"));
        }

        let mut stats = TransferStats::default();
        info!(
            "Transferring {} rows into {}{}",
            rows.len(),
            self.table,
            if self.dry_run { " (dry run)" } else { "" }
        );

        for (index, row) in rows.iter().enumerate() {
            stats.rows_read += 1;
            let values = self.build_row(row, &mut stats)?;

            if values.is_empty() {
                warn!("Row {} has no values to insert, skipping", index + 1);
                stats.rows_skipped += 1;
                continue;
            }

            let statement = render_insert(&self.table, &values);
            stats.statements_built += 1;
            info!(target: STATEMENT_TARGET, "{}", statement);

            if self.dry_run {
                continue;
            }

            match writer.execute(&statement).await {
                Ok(_) => stats.rows_inserted += 1,
                Err(e) => {
                    error!("Insert of row {} into {} failed: {}", index + 1, self.table, e);
                    stats.rows_failed += 1;
                    if self.policy.stop_on_failure {
                        return Err(DonorError::transfer(
                            &self.table,
                            format!("row {}: {}", index + 1, e),
                        ));
                    }
                }
            }
        }

        info!(
            "Transfer into {} finished: {} read, {} inserted, {} failed, {} values rejected",
            self.table, stats.rows_read, stats.rows_inserted, stats.rows_failed, stats.values_rejected
        );
        Ok(stats)
    }

    /// Literals for one donor row, in patient column order.
    ///
    /// A value that cannot be cast aborts the run under `stop_on_failure`;
    /// otherwise its column is left out of the row.
    pub fn build_row(&self, row: &Row, stats: &mut TransferStats) -> Result<Vec<(String, Literal)>> {
        let null = SqlValue::Null;
        let mut values = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let target = &column.target;
            let (result, source) = match &column.action {
                ColumnAction::Omit => continue,
                ColumnAction::Undefined => (self.caster.undefined_column_value(target), None),
                ColumnAction::Cast(source) => {
                    let value = row.get(&source.name).unwrap_or(&null);
                    stats.values_cast += 1;
                    (self.caster.cast(value, target, source), Some((source, value)))
                }
                ColumnAction::Prepare(source) => {
                    let value = row.get(&source.name).unwrap_or(&null);
                    (self.caster.prepare(value, target), Some((source, value)))
                }
            };

            match result {
                Ok(literal) => {
                    debug!("{} = {}", target.name, literal);
                    values.push((target.name.clone(), literal));
                }
                Err(e) => {
                    self.report(&e, source);
                    stats.values_rejected += 1;
                    if self.policy.stop_on_failure {
                        return Err(DonorError::Cast(e));
                    }
                }
            }
        }

        Ok(values)
    }

    fn report(&self, err: &CastError, source: Option<(&ColumnDescriptor, &SqlValue)>) {
        match source {
            Some((source, value)) => error!(
                "Can't transform {} = {} into {}: {}",
                source.name,
                value,
                err.column(),
                err
            ),
            None => error!("Can't fill {}: {}", err.column(), err),
        }
    }
}

/// Quote a MySQL identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render a single-row INSERT statement.
pub fn render_insert(table: &str, values: &[(String, Literal)]) -> String {
    let columns = values
        .iter()
        .map(|(column, _)| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let literals = values
        .iter()
        .map(|(_, literal)| literal.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns,
        literals
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::DefaultValueTable;
    use crate::core::ColumnRelationMap;
    use crate::preflight::SchemaComparator;
    use crate::typemap::CompatibilityChecker;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        statements: Mutex<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    #[async_trait]
    impl PatientWriter for RecordingWriter {
        async fn describe(&self, table: &str) -> Result<TableSchema> {
            Ok(TableSchema::new(table, Vec::new()))
        }

        async fn execute(&self, statement: &str) -> Result<u64> {
            if let Some(needle) = self.fail_containing {
                if statement.contains(needle) {
                    return Err(DonorError::pool("Duplicate entry", "executing insert"));
                }
            }
            self.statements.lock().unwrap().push(statement.to_string());
            Ok(1)
        }
    }

    fn policy(lossy: bool) -> CastPolicy {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let defaults = DefaultValueTable::new(reference)
            .with("INT", 0i64)
            .with("VARCHAR", "undefined");
        CastPolicy::new(defaults).with_lossy(lossy)
    }

    fn donor() -> TableSchema {
        TableSchema::new(
            "clients",
            vec![
                ColumnDescriptor::new("ID", "int(11)").auto_increment(),
                ColumnDescriptor::new("FULL_NAME", "varchar(255)"),
                ColumnDescriptor::new("QTY", "int(11)"),
            ],
        )
    }

    fn patient() -> TableSchema {
        TableSchema::new(
            "customers",
            vec![
                ColumnDescriptor::new("id", "int(11)").auto_increment(),
                ColumnDescriptor::new("name", "varchar(5)"),
                ColumnDescriptor::new("qty", "int(11)"),
                ColumnDescriptor::new("id_client", "int"),
                ColumnDescriptor::new("comment", "text").nullable(),
            ],
        )
    }

    fn plan(policy: &CastPolicy) -> CastPlan {
        let relations = ColumnRelationMap::new()
            .with("name", "FULL_NAME")
            .with("qty", "QTY");
        SchemaComparator::new(CompatibilityChecker::default(), policy)
            .compare(&patient(), &donor(), &relations)
            .unwrap()
    }

    fn row(id: i64, name: &str, qty: i64) -> Row {
        Row::new()
            .with("ID", id)
            .with("FULL_NAME", name)
            .with("QTY", qty)
    }

    #[test]
    fn test_render_insert() {
        let values = vec![
            ("name".to_string(), Literal::quoted("O'Brien")),
            ("we`ird".to_string(), Literal::bare(5)),
            ("comment".to_string(), Literal::Null),
        ];
        assert_eq!(
            render_insert("customers", &values),
            "INSERT INTO `customers` (`name`, `we``ird`, `comment`) VALUES ('O''Brien', 5, NULL)"
        );
    }

    #[test]
    fn test_build_row_walks_patient_columns() {
        let policy = policy(true);
        let plan = plan(&policy);
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let mut stats = TransferStats::default();

        let values = engine
            .build_row(&row(7, "Alexander", 3), &mut stats)
            .unwrap();
        assert_eq!(
            values,
            vec![
                ("name".to_string(), Literal::quoted("Alexa")),
                ("qty".to_string(), Literal::bare(3)),
                ("id_client".to_string(), Literal::bare(0)),
            ]
        );
        assert_eq!(stats.values_cast, 1);
    }

    #[test]
    fn test_auto_increment_kept_when_not_skipped() {
        let mut policy = policy(true);
        policy.skip_auto_increment = false;
        let relations = ColumnRelationMap::new()
            .with("id", "ID")
            .with("name", "FULL_NAME")
            .with("qty", "QTY");
        let plan = SchemaComparator::new(CompatibilityChecker::default(), &policy)
            .compare(&patient(), &donor(), &relations)
            .unwrap();
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);

        let values = engine
            .build_row(&row(7, "Ann", 3), &mut TransferStats::default())
            .unwrap();
        assert_eq!(values[0], ("id".to_string(), Literal::bare(7)));
    }

    #[test]
    fn test_unrelated_auto_increment_left_to_database() {
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut policy =
            CastPolicy::new(DefaultValueTable::new(reference).with("VARCHAR", "undefined"));
        policy.skip_auto_increment = false;
        policy.stop_on_failure = true;
        let target = TableSchema::new(
            "customers",
            vec![
                ColumnDescriptor::new("id", "int(11)").auto_increment(),
                ColumnDescriptor::new("name", "varchar(255)"),
            ],
        );
        let relations = ColumnRelationMap::new().with("name", "FULL_NAME");
        let plan = SchemaComparator::new(CompatibilityChecker::default(), &policy)
            .compare(&target, &donor(), &relations)
            .unwrap();
        let engine = TransferEngine::new(&target, &plan, TypeCatalog::mysql(), &policy);

        let values = engine
            .build_row(&row(7, "Ann", 3), &mut TransferStats::default())
            .unwrap();
        assert_eq!(values, vec![("name".to_string(), Literal::quoted("Ann"))]);
    }

    #[test]
    fn test_null_into_required_column_without_defaults() {
        let mut policy = policy(true);
        policy.default_on_null = false;
        let target = TableSchema::new(
            "customers",
            vec![ColumnDescriptor::new("name", "varchar(255)")],
        );
        let relations = ColumnRelationMap::new().with("name", "FULL_NAME");
        let plan = SchemaComparator::new(CompatibilityChecker::default(), &policy)
            .compare(&target, &donor(), &relations)
            .unwrap();
        let engine = TransferEngine::new(&target, &plan, TypeCatalog::mysql(), &policy);
        let mut stats = TransferStats::default();

        let values = engine
            .build_row(&Row::new().with("FULL_NAME", SqlValue::Null), &mut stats)
            .unwrap();
        assert!(values.is_empty());
        assert_eq!(stats.values_rejected, 1);
    }

    #[test]
    fn test_rejected_value_is_dropped_from_row() {
        let policy = policy(false);
        let plan = plan(&policy);
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let mut stats = TransferStats::default();

        let values = engine
            .build_row(&row(1, "Alexander", 3), &mut stats)
            .unwrap();
        assert!(values.iter().all(|(column, _)| column != "name"));
        assert_eq!(stats.values_rejected, 1);
    }

    #[test]
    fn test_rejected_value_stops_run() {
        let mut policy = policy(false);
        policy.stop_on_failure = true;
        let plan = plan(&policy);
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);

        let err = engine
            .build_row(&row(1, "Alexander", 3), &mut TransferStats::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DonorError::Cast(CastError::ValueTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_inserts_every_row() {
        let policy = policy(true);
        let plan = plan(&policy);
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let writer = RecordingWriter::default();

        let stats = engine
            .run(&[row(1, "Ann", 1), row(2, "Bob", 2)], &writer)
            .await
            .unwrap();

        assert_eq!(stats.rows_read, 2);
        assert_eq!(stats.rows_inserted, 2);
        let statements = writer.statements.lock().unwrap();
        assert_eq!(
            statements[0],
            "INSERT INTO `customers` (`name`, `qty`, `id_client`) VALUES ('Ann', 1, 0)"
        );
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let policy = policy(true);
        let plan = plan(&policy);
        let engine =
            TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy).dry_run(true);
        let writer = RecordingWriter::default();

        let stats = engine.run(&[row(1, "Ann", 1)], &writer).await.unwrap();
        assert_eq!(stats.statements_built, 1);
        assert_eq!(stats.rows_inserted, 0);
        assert!(writer.statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_policy() {
        let mut policy = policy(true);
        let plan = plan(&policy);
        let writer = RecordingWriter {
            fail_containing: Some("'Bob'"),
            ..Default::default()
        };
        let rows = [row(1, "Ann", 1), row(2, "Bob", 2), row(3, "Cid", 3)];

        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let stats = engine.run(&rows, &writer).await.unwrap();
        assert_eq!(stats.rows_inserted, 2);
        assert_eq!(stats.rows_failed, 1);

        policy.stop_on_failure = true;
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let err = engine.run(&rows, &writer).await.unwrap_err();
        assert!(matches!(err, DonorError::Transfer { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[tokio::test]
    async fn test_empty_donor_table() {
        let policy = policy(true);
        let plan = plan(&policy);
        let engine = TransferEngine::new(&patient(), &plan, TypeCatalog::mysql(), &policy);
        let err = engine
            .run(&[], &RecordingWriter::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no data"));
    }
}

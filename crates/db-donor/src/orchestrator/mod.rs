//! Migration orchestrator - main workflow coordinator.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cast::CastPolicy;
use crate::config::Config;
use crate::core::{ColumnRelationMap, DonorReader, PatientWriter};
use crate::drivers::MysqlTable;
use crate::error::Result;
use crate::preflight::{CastPlan, SchemaComparator};
use crate::transfer::{TransferEngine, TransferStats};
use crate::typemap::{CompatibilityChecker, TypeCatalog};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    donor: MysqlTable,
    patient: MysqlTable,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: completed, completed_with_errors or dry_run.
    pub status: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Donor table name.
    pub donor_table: String,

    /// Patient table name.
    pub patient_table: String,

    /// Patient columns whose values were cast.
    pub columns_cast: Vec<String>,

    /// Donor rows read.
    pub rows_read: u64,

    /// Rows written to the patient table.
    pub rows_inserted: u64,

    /// Rows whose INSERT failed or that had no values.
    pub rows_failed: u64,

    /// Values dropped because they could not be cast.
    pub values_rejected: u64,
}

impl MigrationResult {
    /// Serialize the result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Everything a run needs besides the two databases.
pub struct RunSpec<'a> {
    pub donor_table: &'a str,
    pub patient_table: &'a str,
    pub relations: &'a ColumnRelationMap,
    pub policy: &'a CastPolicy,
    pub dry_run: bool,
}

impl Orchestrator {
    /// Create a new orchestrator, connecting to both databases.
    pub async fn new(config: Config) -> Result<Self> {
        let donor = MysqlTable::connect(&config.donor).await?;
        let patient = MysqlTable::connect(&config.patient).await?;
        Ok(Self {
            config,
            donor,
            patient,
        })
    }

    /// Run the migration.
    pub async fn run(self, dry_run: bool) -> Result<MigrationResult> {
        let policy = self.config.cast_policy(Local::now().naive_local());
        let relations = self.config.relations();
        let spec = RunSpec {
            donor_table: &self.config.donor.table,
            patient_table: &self.config.patient.table,
            relations: &relations,
            policy: &policy,
            dry_run,
        };

        let result = run_with(&self.donor, &self.patient, &spec).await;
        self.donor.close().await;
        self.patient.close().await;
        result
    }

    /// Describe both tables and run the pre-flight comparison only.
    pub async fn check(self) -> Result<CastPlan> {
        let policy = self.config.cast_policy(Local::now().naive_local());
        let relations = self.config.relations();
        let spec = RunSpec {
            donor_table: &self.config.donor.table,
            patient_table: &self.config.patient.table,
            relations: &relations,
            policy: &policy,
            dry_run: true,
        };

        let result = check_with(&self.donor, &self.patient, &spec).await;
        self.donor.close().await;
        self.patient.close().await;
        result
    }
}

/// Describe both tables and compare them.
pub async fn check_with<R, W>(donor: &R, patient: &W, spec: &RunSpec<'_>) -> Result<CastPlan>
where
    R: DonorReader + ?Sized,
    W: PatientWriter + ?Sized,
{
    info!("Phase 1: Describing {} and {}", spec.donor_table, spec.patient_table);
    let source = donor.describe(spec.donor_table).await?;
    let target = patient.describe(spec.patient_table).await?;

    info!("Phase 2: Comparing column types");
    SchemaComparator::new(CompatibilityChecker::default(), spec.policy).compare(
        &target,
        &source,
        spec.relations,
    )
}

/// Run a whole migration against any reader/writer pair.
pub async fn run_with<R, W>(donor: &R, patient: &W, spec: &RunSpec<'_>) -> Result<MigrationResult>
where
    R: DonorReader + ?Sized,
    W: PatientWriter + ?Sized,
{
    let started_at = Utc::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    info!("Starting migration run: {}", run_id);

    let source = donor.describe(spec.donor_table).await?;
    let target = patient.describe(spec.patient_table).await?;
    let plan = SchemaComparator::new(CompatibilityChecker::default(), spec.policy).compare(
        &target,
        &source,
        spec.relations,
    )?;

    info!("Reading donor table {}", spec.donor_table);
    let rows = donor.fetch_all_rows(&source).await?;

    let stats: TransferStats =
        TransferEngine::new(&target, &plan, TypeCatalog::mysql(), spec.policy)
            .dry_run(spec.dry_run)
            .run(&rows, patient)
            .await?;

    let completed_at = Utc::now();
    let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
    let rows_failed = stats.rows_failed + stats.rows_skipped;

    let status = if spec.dry_run {
        "dry_run"
    } else if rows_failed > 0 || stats.values_rejected > 0 {
        "completed_with_errors"
    } else {
        "completed"
    };

    let result = MigrationResult {
        run_id,
        status: status.to_string(),
        started_at,
        completed_at,
        duration_seconds: duration,
        donor_table: spec.donor_table.to_string(),
        patient_table: spec.patient_table.to_string(),
        columns_cast: plan.needs_cast.iter().cloned().collect(),
        rows_read: stats.rows_read,
        rows_inserted: stats.rows_inserted,
        rows_failed,
        values_rejected: stats.values_rejected,
    };

    info!(
        "Migration {}: {} rows read, {} inserted, {} failed in {:.1}s",
        result.status,
        result.rows_read,
        result.rows_inserted,
        result.rows_failed,
        result.duration_seconds
    );

    Ok(result)
}

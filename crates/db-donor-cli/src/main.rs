//! db-donor CLI - copy rows from a donor MySQL table into a patient table.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use db_donor::{CastPlan, Config, DonorError, MigrationResult, Orchestrator};
use tracing::info;

#[derive(Parser)]
#[command(name = "db-donor")]
#[command(about = "Copy rows from a donor MySQL table into a patient table with a different schema")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "db-donor.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Also write message and SQL statement logs, named by date, into this directory
    #[arg(long, env = "DB_DONOR_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every donor row into the patient table
    Run {
        /// Dry run: build and log the INSERT statements without executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare donor and patient column types without copying data
    Check,

    /// Write a starter configuration file
    Init {
        /// Output path for configuration file [default: db-donor.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DonorError> {
    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing config)
    if let Commands::Init { output, force } = &cli.command {
        let output_path = output
            .clone()
            .unwrap_or_else(|| PathBuf::from("db-donor.yaml"));
        write_template(&output_path, *force)?;
        println!("Configuration written to {}", output_path.display());
        return Ok(());
    }

    logging::setup_logging(&cli.verbosity, &cli.log_format, cli.log_dir.as_deref())
        .map_err(DonorError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    info!(
        "Donor {} -> patient {}",
        config.donor.qualified_table(),
        config.patient.qualified_table()
    );

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above

        Commands::Run { dry_run } => {
            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.run(dry_run).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_result(&result, dry_run);
            }
        }

        Commands::Check => {
            let orchestrator = Orchestrator::new(config).await?;
            let plan = orchestrator.check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
            } else {
                print_plan(&plan);
            }
        }
    }

    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<(), DonorError> {
    if path.exists() && !force {
        return Err(DonorError::Config(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }
    std::fs::write(path, Config::template())?;
    Ok(())
}

fn print_result(result: &MigrationResult, dry_run: bool) {
    let status_msg = if dry_run {
        "Dry run completed!"
    } else {
        "Migration completed!"
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", result.run_id);
    println!("  Status: {}", result.status);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  {} -> {}", result.donor_table, result.patient_table);
    println!("  Rows read: {}", result.rows_read);
    println!("  Rows inserted: {}", result.rows_inserted);
    if result.rows_failed > 0 {
        println!("  Rows failed: {}", result.rows_failed);
    }
    if result.values_rejected > 0 {
        println!("  Values rejected: {}", result.values_rejected);
    }
    if !result.columns_cast.is_empty() {
        println!("  Columns cast: {}", result.columns_cast.join(", "));
    }
}

fn print_plan(plan: &CastPlan) {
    println!("Schema check passed");
    for relation in &plan.relations {
        let marker = if plan.needs_cast(&relation.target.name) {
            "cast"
        } else {
            "copy"
        };
        println!(
            "  {:<4} {} ({}) <- {} ({})",
            marker,
            relation.target.name,
            relation.target.raw_type,
            relation.source.name,
            relation.source.raw_type
        );
    }
}

fn plan_json(plan: &CastPlan) -> serde_json::Value {
    let relations: Vec<_> = plan
        .relations
        .iter()
        .map(|r| {
            serde_json::json!({
                "target": r.target,
                "source": r.source,
                "needs_cast": plan.needs_cast(&r.target.name),
            })
        })
        .collect();
    serde_json::json!({
        "status": "compatible",
        "relations": relations,
        "needs_cast": plan.needs_cast,
    })
}

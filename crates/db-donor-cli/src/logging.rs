//! Tracing setup: stderr output plus optional log files.
//!
//! With a log directory, messages go to `<dir>/<date>.log` and every INSERT
//! statement goes to `<dir>/sql_<date>.log`, where `<date>` is the day the
//! process started; files do not rotate during a run. Statements reach
//! stderr only at debug verbosity.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use db_donor::STATEMENT_TARGET;
use tracing::Level;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the global subscriber.
pub fn setup_logging(verbosity: &str, format: &str, log_dir: Option<&Path>) -> Result<(), String> {
    let level = parse_level(verbosity);
    let json = match format.to_lowercase().as_str() {
        "text" => false,
        "json" => true,
        other => return Err(format!("unknown log format '{}', expected text or json", other)),
    };

    let statements_on_console = if level == Level::DEBUG {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    let console_filter = Targets::new()
        .with_default(level)
        .with_target(STATEMENT_TARGET, statements_on_console);

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let mut layers: Vec<BoxedLayer> = vec![if json {
        console.json().with_filter(console_filter).boxed()
    } else {
        console.with_filter(console_filter).boxed()
    }];

    if let Some(dir) = log_dir {
        layers.extend(file_layers(dir, level)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| e.to_string())
}

fn parse_level(verbosity: &str) -> Level {
    match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Message and statement file layers for `dir`, named after the start date.
fn file_layers(dir: &Path, level: Level) -> Result<Vec<BoxedLayer>, String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("can't create log directory {}: {}", dir.display(), e))?;

    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let messages = open_append(&dir.join(format!("{}.log", date)))?;
    let statements = open_append(&dir.join(format!("sql_{}.log", date)))?;

    let message_layer = fmt::layer()
        .with_writer(Mutex::new(messages))
        .with_ansi(false)
        .with_target(false)
        .with_filter(
            Targets::new()
                .with_default(level)
                .with_target(STATEMENT_TARGET, LevelFilter::OFF),
        )
        .boxed();

    let statement_layer = fmt::layer()
        .with_writer(Mutex::new(statements))
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .with_filter(Targets::new().with_target(STATEMENT_TARGET, Level::TRACE))
        .boxed();

    Ok(vec![message_layer, statement_layer])
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("can't open log file {}: {}", path.display(), e))
}

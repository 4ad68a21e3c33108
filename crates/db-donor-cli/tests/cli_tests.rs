//! CLI integration tests for db-donor.
//!
//! These tests cover argument parsing, help output, the init command and
//! exit codes for configuration errors. None of them needs a database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the db-donor binary.
fn cmd() -> Command {
    Command::cargo_bin("db-donor").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_check_command_exists() {
    cmd()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compare donor and patient column types"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("db-donor"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-dir"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: db-donor.yaml]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "donor:").unwrap();
    writeln!(file, "  host: localhost").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2);
}

#[test]
fn test_same_table_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let side = "  host: localhost\n  database: shop\n  user: root\n  table: customers\n";
    write!(file, "donor:\n{side}patient:\n{side}").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run", "--dry-run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("same table"));
}

#[test]
fn test_unknown_log_format_exits_with_code_2() {
    cmd()
        .args(["--log-format", "xml", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown log format"));
}

// =============================================================================
// Init Tests
// =============================================================================

#[test]
fn test_init_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db-donor.yaml");

    cmd()
        .args(["init", "--output", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("columns_relations:"));
    assert!(content.contains("default_null_values: true"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "keep me").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    cmd()
        .args(["init", "--output", &path])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    cmd()
        .args(["init", "--output", &path, "--force"])
        .assert()
        .success();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# db-donor configuration"));
}

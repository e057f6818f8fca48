//! Runs the events-provision binary the way a hosting platform would.

use serde_json::Value;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_events-provision"))
        .args(args)
        // Keep the user's config and environment out of the run.
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .current_dir(dir.path())
        .env_remove("EVENTS_BACKEND")
        .env_remove("EVENTS_SCHEMA")
        .env_remove("EVENTS_ODBC_DRIVER")
        .output()
        .unwrap()
}

fn write_params(dir: &TempDir, mode: Value) -> String {
    let url = format!("sqlite://{}", dir.path().join("events.db").display());
    let params = serde_json::json!({
        "__bx_creds": { "local": { "dsn": url } },
        "mode": mode
    });
    let path = dir.path().join("params.json");
    std::fs::write(&path, params.to_string()).unwrap();
    path.display().to_string()
}

/// stdout must hold exactly one JSON document, the envelope.
fn envelope(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1, "stdout: {stdout}");
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_result_exits_zero() {
    let dir = TempDir::new().unwrap();
    let params = write_params(&dir, "setup".into());

    let output = run(&dir, &["--params", &params]);

    assert_eq!(output.status.code(), Some(0));
    let json = envelope(&output);
    assert_eq!(json["result"]["mode"], "setup");
    assert_eq!(json["result"]["backend"], "sqlite");
}

#[test]
fn test_dberror_exits_one() {
    let dir = TempDir::new().unwrap();
    let params = write_params(&dir, "cleanup".into());

    let output = run(&dir, &["--params", &params]);

    assert_eq!(output.status.code(), Some(1));
    let json = envelope(&output);
    assert_eq!(json["dberror"]["kind"], "statement");
    assert!(json.get("result").is_none());
}

#[test]
fn test_null_mode_is_dberror() {
    let dir = TempDir::new().unwrap();
    let params = write_params(&dir, Value::Null);

    let output = run(&dir, &["--params", &params]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(envelope(&output)["dberror"]["kind"], "mode");
}

#[test]
fn test_mode_flag_overrides_parameters() {
    let dir = TempDir::new().unwrap();
    let params = write_params(&dir, "bogus".into());

    let output = run(&dir, &["--params", &params, "--mode", "setup"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(envelope(&output)["result"]["mode"], "setup");
}

#[test]
fn test_unreadable_params_exits_two() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let output = run(&dir, &["--params", &missing.display().to_string()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_print_sql_does_not_connect() {
    let dir = TempDir::new().unwrap();

    let output = run(&dir, &["--print-sql", "--mode", "cleanup", "--schema", "APPDATA"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().trim_end(),
        "drop table APPDATA.events;"
    );
    assert!(!dir.path().join("events.db").exists());
}

//! Integration tests for the CLI binary.
//!
//! Drives `gatectl` against a temporary data directory.
//!
//! This test is registered as a [[test]] in the gatekeep-cli crate
//! so that CARGO_BIN_EXE_gatectl is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `gatectl` binary.
fn gatectl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gatectl"))
}

/// Run `gatectl --data-dir DIR ARGS...`.
fn run(dir: &Path, args: &[&str]) -> Output {
    gatectl()
        .arg("--data-dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to execute gatectl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run(dir, &full);
    assert!(
        output.status.success(),
        "gatectl {args:?} failed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON output")
}

#[test]
fn cli_responds_to_help() {
    let output = gatectl()
        .arg("--help")
        .output()
        .expect("failed to execute gatectl --help");

    assert!(
        output.status.success(),
        "gatectl --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let text = stdout(&output);
    assert!(
        text.contains("Usage") && text.contains("scan"),
        "gatectl --help output should contain usage information, got: {text}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = gatectl()
        .arg("--version")
        .output()
        .expect("failed to execute gatectl --version");

    assert!(output.status.success());
    assert!(stdout(&output).contains("gatectl"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = gatectl()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute gatectl");

    assert!(
        !output.status.success(),
        "gatectl with unknown flag should exit with error"
    );
}

#[test]
fn cli_user_lifecycle_and_scans() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let alice = json(
        dir,
        &["user", "add", "--name", "Alice", "--token", "aa:bb:cc", "--tier", "trainer"],
    );
    assert_eq!(alice["id"], 0);
    assert_eq!(alice["token"], "AA:BB:CC");
    assert_eq!(alice["tier"], 2);

    let granted = json(dir, &["scan", "AABBCC"]);
    assert_eq!(granted["decision"]["Granted"]["identity_id"], 0);
    assert_eq!(granted["event"]["seq"], 0);

    let denied = json(dir, &["scan", "00:00:00"]);
    assert_eq!(denied["decision"], "Denied");
    assert_eq!(denied["event"]["identity_id"], 0);

    let updated = json(dir, &["user", "update", "0", "--name", "Alice B"]);
    assert_eq!(updated["name"], "Alice B");
    assert!(updated["last_seen"].as_u64().unwrap() > 0);

    let log = json(dir, &["log", "list"]);
    assert_eq!(log.as_array().unwrap().len(), 2);

    json(dir, &["user", "delete", "0"]);
    let users = json(dir, &["user", "list"]);
    assert!(users.as_array().unwrap().is_empty());
    let shown = json(dir, &["user", "show", "0"]);
    assert_eq!(shown["active"], false);

    let status = json(dir, &["status"]);
    assert_eq!(status["identity_count"], 1);
    assert_eq!(status["event_count"], 2);
    assert_eq!(status["active_identities"], 0);
    assert_eq!(status["location"], "Main Entrance");

    let cleared = json(dir, &["log", "clear"]);
    assert_eq!(cleared["cleared"], 2);
    assert!(json(dir, &["log", "list"]).as_array().unwrap().is_empty());
}

#[test]
fn cli_duplicate_token_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let ok = run(dir, &["user", "add", "--name", "Alice", "--token", "01:02"]);
    assert!(ok.status.success());

    let dup = run(dir, &["user", "add", "--name", "Mallory", "--token", "01:02"]);
    assert!(!dup.status.success());
    let stderr = String::from_utf8_lossy(&dup.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("Conflict"), "stderr: {stderr}");
}

#[test]
fn cli_rejects_bad_input() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let bad_tier = run(dir, &["user", "add", "--name", "A", "--token", "01", "--tier", "root"]);
    assert!(!bad_tier.status.success());

    let long_uid = run(dir, &["scan", "0102030405060708090A0B"]);
    assert!(!long_uid.status.success());

    let missing = run(dir, &["user", "show", "7"]);
    assert!(!missing.status.success());

    let empty_update = run(dir, &["user", "update", "0"]);
    assert!(!empty_update.status.success());
}

#[test]
fn cli_reads_location_from_config() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    std::fs::write(
        dir.join("config.json"),
        r#"{"location":"Side Door","event_limit":1}"#,
    )
    .unwrap();

    json(dir, &["scan", "01"]);
    json(dir, &["scan", "02"]);
    let log = json(dir, &["log", "list"]);
    let events = log.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["location"], "Side Door");
    assert_eq!(events[0]["token"], "02");
}

#[test]
fn cli_human_output() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let added = run(dir, &["user", "add", "--name", "Alice", "--token", "AA"]);
    assert!(stdout(&added).contains("Created identity 0"));

    let scan = run(dir, &["scan", "AA"]);
    assert!(stdout(&scan).contains("GRANTED"));

    let list = run(dir, &["user", "list"]);
    let text = stdout(&list);
    assert!(text.contains("Alice") && text.contains("Member"), "{text}");
}

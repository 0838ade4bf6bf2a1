//! Integration tests for the `lifelog send` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn lifelog() -> Command {
    Command::cargo_bin("lifelog").unwrap()
}

#[test]
fn test_send_expense_routes_to_event_logger() {
    let assert = lifelog().arg("send").arg("spent 4.50 on coffee").assert().success();

    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Send output should be valid JSON");

    assert_eq!(json["success"], true);
    assert_eq!(json["target_agent"], "event-logger");
    assert_eq!(json["classification"]["kind"], "event");
    assert_eq!(json["classification"]["subtype"], "expense");
    assert_eq!(json["total_steps"], 1);
}

#[test]
fn test_send_chat_message() {
    let assert = lifelog().arg("send").arg("good morning").assert().success();

    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["target_agent"], "chat");
}

#[test]
fn test_send_with_config_file() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        "[rate_limit]\nwindow_ms = 1000\nlimit = 5\n\n[routing]\nconfidence_floor = 0.9\n"
    )
    .unwrap();

    // With a 0.9 floor every keyword classification falls back to chat
    let assert = lifelog()
        .arg("--config")
        .arg(config.path())
        .arg("send")
        .arg("spent 4.50 on coffee")
        .assert()
        .success();

    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["target_agent"], "chat");
}

#[test]
fn test_send_rejects_invalid_config() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[rate_limit]\nlimit = 0\n").unwrap();

    lifelog()
        .arg("--config")
        .arg(config.path())
        .arg("send")
        .arg("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rate_limit.limit"));
}

#[test]
fn test_send_unknown_provider_fails() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[model]\nprovider = \"carrier-pigeon\"\n").unwrap();

    lifelog()
        .arg("--config")
        .arg(config.path())
        .arg("send")
        .arg("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid model.provider"));
}

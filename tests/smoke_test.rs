//! Smoke tests for the ct binary.

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_version() {
    Command::new(env!("CARGO_BIN_EXE_ct"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ct"));
}

#[test]
fn test_help_lists_commands() {
    Command::new(env!("CARGO_BIN_EXE_ct"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("weekly"));
}

#[test]
fn test_init_json_and_human() {
    let env = TestEnv::new();
    env.ct()
        .args(["system", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));

    env.ct()
        .args(["system", "init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already initialized"));
}

#[test]
fn test_commands_before_init_fail_with_json_error() {
    let env = TestEnv::new();
    env.ct()
        .args(["group", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn test_human_errors_are_plain_text() {
    let env = TestEnv::new();
    env.ct()
        .args(["group", "list", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_detect_date_needs_no_init() {
    let env = TestEnv::new();
    env.ct()
        .args(["detect-date", "revisar bomba el viernes a las 9:05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"date\":\"2025-02-07\""))
        .stdout(predicate::str::contains("\"time\":\"09:05\""));
}

#[test]
fn test_invalid_today_is_rejected() {
    let env = TestEnv::init();
    env.ct()
        .args(["summary", "--today", "mañana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));
}

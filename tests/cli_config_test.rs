//! Integration tests for configuration layering and the action log.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_viewer_defaults_and_sources() {
    let env = TestEnv::init();
    let config = env.json("ana", &["config", "show"]);
    assert_eq!(config["viewer"]["value"], "ana");
    assert_eq!(config["viewer"]["source"], "cli");
    assert_eq!(config["context"]["value"], "work");
    assert_eq!(config["context"]["source"], "default");

    let config: serde_json::Value = serde_json::from_slice(
        &env.ct()
            .env("CT_USER", "beto")
            .args(["config", "show"])
            .assert()
            .success()
            .get_output()
            .stdout,
    )
    .unwrap();
    assert_eq!(config["viewer"]["value"], "beto");
    assert_eq!(config["viewer"]["source"], "env:CT_USER");
}

#[test]
fn test_set_writes_data_dir_config() {
    let env = TestEnv::init();
    env.ct()
        .args(["config", "set", "viewer", "carla"])
        .assert()
        .success();
    env.ct()
        .args(["config", "set", "context", "personal"])
        .assert()
        .success();

    let kdl = fs::read_to_string(env.data_path().join("config.kdl")).unwrap();
    assert!(kdl.contains("carla"));

    let config: serde_json::Value = serde_json::from_slice(
        &env.ct().args(["config", "show"]).assert().success().get_output().stdout,
    )
    .unwrap();
    assert_eq!(config["viewer"]["value"], "carla");
    assert_eq!(config["viewer"]["source"], "data-dir");
    assert_eq!(config["context"]["value"], "personal");

    // The env var still beats the data directory
    let config: serde_json::Value = serde_json::from_slice(
        &env.ct()
            .env("CT_CONTEXT", "work")
            .args(["config", "show"])
            .assert()
            .success()
            .get_output()
            .stdout,
    )
    .unwrap();
    assert_eq!(config["context"]["value"], "work");
}

#[test]
fn test_set_rejects_bad_values() {
    let env = TestEnv::init();
    env.ct()
        .args(["config", "set", "context", "casa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
    env.ct()
        .args(["config", "set", "colour", "red"])
        .assert()
        .failure();
}

#[test]
fn test_system_config_is_read() {
    let env = TestEnv::init();
    fs::write(
        env.config_dir.path().join("config.kdl"),
        "viewer \"dora\"\noutput-format \"human\"\n",
    )
    .unwrap();
    env.ct()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("viewer = dora (system)"));
}

#[test]
fn test_default_priority_applies_to_new_tasks() {
    let env = TestEnv::init();
    env.ct()
        .args(["config", "set", "default-priority", "high"])
        .assert()
        .success();
    let (group, _) = env.group("ana", "Planta");
    let task = env.json("ana", &["task", "create", "Revisar", "-g", &group]);
    assert_eq!(task["priority"], "high");
}

#[test]
fn test_action_log_records_commands() {
    let env = TestEnv::init();
    env.group("ana", "Planta");
    env.ct_as("ana")
        .args(["group", "leave", "ctg-000000"])
        .assert()
        .failure();

    let log = env.json("ana", &["system", "log"]);
    let entries = log["entries"].as_array().unwrap();
    let commands: Vec<&str> = entries
        .iter()
        .map(|e| e["command"].as_str().unwrap())
        .collect();
    assert!(commands.contains(&"group create"));
    let failed = entries
        .iter()
        .find(|e| e["command"] == "group leave")
        .unwrap();
    assert_eq!(failed["success"], false);
    assert_eq!(failed["user"], "ana");
}

#[test]
fn test_action_log_can_be_disabled() {
    let env = TestEnv::init();
    env.ct()
        .args(["config", "set", "action-log", "false"])
        .assert()
        .success();
    let before = fs::read_to_string(env.data_path().join("actions.jsonl")).unwrap_or_default();
    env.group("ana", "Planta");
    let after = fs::read_to_string(env.data_path().join("actions.jsonl")).unwrap_or_default();
    assert_eq!(before, after);
}

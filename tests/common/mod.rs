//! Common test utilities for crewtask integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/crewtask/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Date every test treats as today (a Wednesday).
pub const TODAY: &str = "2025-02-05";

/// A test environment with isolated data and config storage.
///
/// The `ct()` method sets `CT_DATA_DIR` and `CT_CONFIG_DIR` per-invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize crewtask.
    pub fn init() -> Self {
        let env = Self::new();
        env.ct().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the ct binary acting as the default viewer.
    pub fn ct(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ct"));
        cmd.env("CT_DATA_DIR", self.data_dir.path());
        cmd.env("CT_CONFIG_DIR", self.config_dir.path());
        cmd.env("CT_TODAY", TODAY);
        cmd.env_remove("CT_USER");
        cmd.env_remove("CT_CONTEXT");
        cmd.env_remove("CT_LOG");
        cmd
    }

    /// Get a Command for the ct binary acting as `user`.
    pub fn ct_as(&self, user: &str) -> Command {
        let mut cmd = self.ct();
        cmd.args(["--as", user]);
        cmd
    }

    /// Run a successful command as `user` and parse its JSON output.
    pub fn json(&self, user: &str, args: &[&str]) -> serde_json::Value {
        let output = self.ct_as(user).args(args).assert().success();
        serde_json::from_slice(&output.get_output().stdout).unwrap()
    }

    /// Create a work group owned by `user`, returning (id, invite code).
    pub fn group(&self, user: &str, name: &str) -> (String, String) {
        let group = self.json(user, &["group", "create", name]);
        (
            group["id"].as_str().unwrap().to_string(),
            group["inviteCode"].as_str().unwrap().to_string(),
        )
    }

    /// Create a task in `group` as `user`, returning its id.
    pub fn task(&self, user: &str, group: &str, title: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "create", title, "-g", group];
        args.extend_from_slice(extra);
        let task = self.json(user, &args);
        task["id"].as_str().unwrap().to_string()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

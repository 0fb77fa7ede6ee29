//! Action logging for `ct` commands.
//!
//! Every CLI invocation is appended to `actions.jsonl` in the data
//! directory, unless `action-log #false` is configured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// File name of the action log inside the data directory.
pub const ACTION_LOG_FILE: &str = "actions.jsonl";

const MAX_STRING_CHARS: usize = 100;
const MAX_ARRAY_ITEMS: usize = 10;

/// A single action log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "task create", "summary")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// User id the command acted as
    pub user: String,
}

/// Path of the action log for a data directory.
pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ACTION_LOG_FILE)
}

/// Append an entry to the data directory's action log.
///
/// Failures are reported through tracing and never fail the command.
pub fn log_action(data_dir: &Path, entry: ActionLog) {
    let entry = ActionLog {
        args: sanitize_args(&entry.args),
        ..entry
    };
    if let Err(e) = write_log_entry(&log_path(data_dir), &entry) {
        tracing::warn!(error = %e, "failed to write action log");
    }
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Read all entries, skipping malformed lines.
pub fn read_log(data_dir: &Path) -> Result<Vec<ActionLog>> {
    let path = log_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(fs::read_to_string(path)?
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

/// Shorten long strings and summarize large arrays.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_args(v)))
                .collect(),
        ),
        serde_json::Value::Array(arr) if arr.len() > MAX_ARRAY_ITEMS => {
            serde_json::Value::String(format!("[Array with {} items]", arr.len()))
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
        }
        serde_json::Value::String(s) => {
            let chars = s.chars().count();
            if chars > MAX_STRING_CHARS {
                let head: String = s.chars().take(MAX_STRING_CHARS - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, chars))
            } else {
                serde_json::Value::String(s.clone())
            }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(command: &str, args: serde_json::Value) -> ActionLog {
        ActionLog {
            timestamp: Utc::now(),
            command: command.to_string(),
            args,
            success: true,
            error: None,
            duration_ms: 3,
            user: "ana".to_string(),
        }
    }

    #[test]
    fn test_log_appends_entries() {
        let dir = TempDir::new().unwrap();
        log_action(dir.path(), entry("task create", json!({"title": "Revisar"})));
        log_action(dir.path(), entry("summary", json!({})));
        let entries = read_log(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "task create");
        assert_eq!(entries[1].user, "ana");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundaries() {
        let long = "ñ".repeat(150);
        let out = sanitize_args(&json!({ "text": long }));
        let text = out["text"].as_str().unwrap();
        assert!(text.starts_with(&"ñ".repeat(97)));
        assert!(text.ends_with("(150 chars)"));
    }

    #[test]
    fn test_sanitize_summarizes_large_arrays() {
        let ids: Vec<String> = (0..12).map(|i| format!("u{}", i)).collect();
        let out = sanitize_args(&json!({ "assignees": ids }));
        assert_eq!(out["assignees"], "[Array with 12 items]");
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_log(dir.path()).unwrap().is_empty());
    }
}

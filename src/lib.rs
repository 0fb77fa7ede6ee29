//! Crewtask - a shared task tracker for small teams.
//!
//! This library provides the core functionality for the `ct` CLI tool:
//! the task lifecycle state machine, natural-language due date detection,
//! urgency and reward scoring, daily summaries, weekly reports and the
//! notification feed router.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::NaiveDate;

    use crate::engine::{Engine, FixedClock, OfflineRemote};
    use crate::models::{Context, Group, Priority, Task};
    use crate::storage::{MemoryBackend, Storage};

    /// Wednesday, used as "today" across unit tests.
    pub fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
    }

    /// Parse a `YYYY-MM-DD` literal.
    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Build a pending task owned by `creator` with the given assignees.
    pub fn task(id: &str, creator: &str, assignees: &[&str]) -> Task {
        let mut task = Task::new(
            id.to_string(),
            "grp-1".to_string(),
            format!("Task {}", id),
            creator.to_string(),
        );
        task.assignees = assignees.iter().map(|a| a.to_string()).collect();
        task.priority = Priority::Medium;
        task
    }

    /// A work group with the given members; the first member is the creator.
    pub fn group(id: &str, members: &[&str]) -> Group {
        let mut group = Group::new(
            id.to_string(),
            format!("Group {}", id),
            Context::Work,
            members[0].to_string(),
            "ABC123".to_string(),
        );
        for member in &members[1..] {
            group.add_member(member);
        }
        group
    }

    /// Engine over an in-memory store, pinned to [`wednesday`].
    pub fn engine() -> Engine<Storage<MemoryBackend>, OfflineRemote> {
        Engine::new(
            Storage::in_memory(),
            OfflineRemote::default(),
            Box::new(FixedClock::on(wednesday())),
        )
    }
}

/// Library-level error type for Crewtask operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run `ct system init` first")]
    NotInitialized,

    /// Actor is neither an assignee nor the creator of the task.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The user who requested validation tried to validate it.
    #[error("Cannot validate your own request: {0}")]
    SelfValidation(String),

    /// A required field is empty or malformed (assignees, reasons).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The remote write failed after a local optimistic update.
    /// Local state has already been reverted when this is returned.
    #[error("Remote sync failed: {0}")]
    RemoteSync(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl From<kdl::KdlError> for Error {
    fn from(err: kdl::KdlError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for Crewtask operations.
pub type Result<T> = std::result::Result<T, Error>;

//! CLI argument definitions for Crewtask.

use clap::{Parser, Subcommand};
use serde::Serialize;

/// `--version` output with the build's commit and timestamp.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CT_GIT_COMMIT"),
    ", built ",
    env!("CT_BUILD_TIMESTAMP"),
    ")"
);

/// Crewtask - a shared task tracker for small teams.
///
/// Start with `ct system init`, create a group, then add tasks to it.
#[derive(Parser, Debug)]
#[command(name = "ct")]
#[command(author, version, long_version = LONG_VERSION, about = "Shared task tracker with daily summaries and weekly reports", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Act as this user id (overrides CT_USER and the configured viewer)
    #[arg(long = "as", global = true, value_name = "USER")]
    pub as_user: Option<String>,

    /// Active context: work or personal (overrides CT_CONTEXT)
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true, env = "CT_TODAY", value_name = "DATE")]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// System administration (init, compact, action log)
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Cached user profiles (display names)
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Group management and leaderboards
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Task lifecycle commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Daily digest of the tasks in scope
    Summary {
        /// Group id, or "all" for every group of the active context
        #[arg(short, long, default_value = "all")]
        group: String,
    },

    /// Weekly report over the last seven days
    Weekly {
        /// Group id, or "all" for every group of the active context
        #[arg(short, long, default_value = "all")]
        group: String,

        /// Pick a fixed greeting instead of a random one
        #[arg(long)]
        greeting: Option<usize>,
    },

    /// Notification feed for the acting user
    Feed {
        /// Group id, or "all" for every group of the active context
        #[arg(short, long, default_value = "all")]
        group: String,
    },

    /// Suggestion management
    Suggestion {
        #[command(subcommand)]
        command: SuggestionCommands,
    },

    /// Detect a due date and time in free text
    DetectDate {
        /// Text to scan (e.g., "revisar bomba para el lunes 08:30")
        text: String,
    },

    /// Apply an event pushed by the remote service
    Push {
        /// Event JSON (e.g., {"type":"task-deleted","taskId":"ct-1a2b3c"})
        event: String,
    },
}

/// System subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemCommands {
    /// Initialize the data directory
    Init,

    /// Rewrite every collection with one line per record
    Compact,

    /// Show recent entries of the action log
    Log {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,

    /// Set a value in the data directory's config.kdl
    Set {
        /// Configuration key (viewer, context, output-format, default-priority, log-level, action-log)
        key: String,
        /// Configuration value
        value: String,
    },
}

/// User subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserCommands {
    /// Add or update a user profile
    Add {
        /// User id
        id: String,
        /// Display name
        name: String,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// List user profiles
    List,
}

/// Group subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupCommands {
    /// Create a group; you become its creator and first member
    Create {
        /// Group name
        name: String,
        /// Context: work or personal
        #[arg(short = 't', long = "type", default_value = "work")]
        kind: String,
    },

    /// List groups
    List,

    /// Join a group by invite code
    Join {
        /// Six-character invite code
        code: String,
    },

    /// Leave a group (the creator is notified)
    Leave {
        /// Group id
        id: String,
    },

    /// Delete a group with its tasks and suggestions (creator only)
    Delete {
        /// Group id
        id: String,
    },

    /// Members ranked by reward points
    Leaderboard {
        /// Group id
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCommands {
    /// Create a task; the due date is detected from the title unless given
    Create {
        /// Task title
        title: String,

        /// Owning group id
        #[arg(short, long)]
        group: String,

        /// Assignee user id (repeatable; defaults to you)
        #[arg(short, long = "assignee")]
        assignee: Vec<String>,

        /// Category label (e.g., Crítico, Auditoría, Mantención)
        #[arg(short, long, default_value = "")]
        category: String,

        /// Due: today, tomorrow, yesterday or YYYY-MM-DD
        #[arg(short, long)]
        due: Option<String>,

        /// Display time (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// Priority: low, medium or high
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// List tasks in scope, most urgent first
    List {
        /// Group id, or "all" for every group of the active context
        #[arg(short, long, default_value = "all")]
        group: String,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show task details with urgency and reward breakdown
    Show {
        /// Task ID (e.g., ct-a1b2c3)
        id: String,
    },

    /// Main action: complete, request validation, validate, or ask for a restore
    Act {
        /// Task ID
        id: String,
    },

    /// Push a task to tomorrow
    Postpone {
        /// Task ID
        id: String,
        /// Reason (required from the second postponement)
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Block a task
    Block {
        /// Task ID
        id: String,
        /// What is blocking it
        reason: String,
    },

    /// Clear a block
    Unblock {
        /// Task ID
        id: String,
    },

    /// Reopen a completed task with new assignees and due date
    Restore {
        /// Task ID
        id: String,
        /// New assignee (repeatable, at least one)
        #[arg(short, long = "assignee", required = true)]
        assignee: Vec<String>,
        /// New due: today, tomorrow, yesterday or YYYY-MM-DD
        #[arg(short, long, default_value = "today")]
        due: String,
        /// New display time (HH:MM)
        #[arg(long)]
        time: Option<String>,
    },

    /// Add a comment; @id or @Name mentions notify members
    Comment {
        /// Task ID
        id: String,
        /// Comment text
        text: String,
    },

    /// Mark a task's comments as read
    Read {
        /// Task ID
        id: String,
    },
}

/// Suggestion subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionCommands {
    /// Remove a processed suggestion from the feed
    Dismiss {
        /// Suggestion ID (e.g., cts-a1b2c3)
        id: String,
    },
}

impl Commands {
    /// Command name for the action log (e.g., "task create").
    pub fn name(&self) -> String {
        let sub = |value: serde_json::Value| -> String {
            match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Object(map) => map.keys().next().cloned().unwrap_or_default(),
                _ => String::new(),
            }
        };
        let (top, inner) = match self {
            Commands::System { command } => ("system", serde_json::to_value(command).ok()),
            Commands::Config { command } => ("config", serde_json::to_value(command).ok()),
            Commands::User { command } => ("user", serde_json::to_value(command).ok()),
            Commands::Group { command } => ("group", serde_json::to_value(command).ok()),
            Commands::Task { command } => ("task", serde_json::to_value(command).ok()),
            Commands::Suggestion { command } => ("suggestion", serde_json::to_value(command).ok()),
            Commands::Summary { .. } => ("summary", None),
            Commands::Weekly { .. } => ("weekly", None),
            Commands::Feed { .. } => ("feed", None),
            Commands::DetectDate { .. } => ("detect-date", None),
            Commands::Push { .. } => ("push", None),
        };
        match inner.map(sub) {
            Some(name) if !name.is_empty() => format!("{} {}", top, name),
            _ => top.to_string(),
        }
    }

    /// Command arguments for the action log.
    pub fn args(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_command_names() {
        assert_eq!(parse(&["ct", "system", "init"]).command.name(), "system init");
        assert_eq!(
            parse(&["ct", "task", "create", "x", "-g", "ctg-1"]).command.name(),
            "task create"
        );
        assert_eq!(parse(&["ct", "summary"]).command.name(), "summary");
    }

    #[test]
    fn test_global_flags_anywhere() {
        let cli = parse(&["ct", "task", "act", "ct-1", "--as", "beto", "-H"]);
        assert_eq!(cli.as_user.as_deref(), Some("beto"));
        assert!(cli.human_readable);
    }

    #[test]
    fn test_restore_requires_assignee() {
        assert!(Cli::try_parse_from(["ct", "task", "restore", "ct-1"]).is_err());
    }

    #[test]
    fn test_args_serialize() {
        let cli = parse(&["ct", "task", "block", "ct-1", "sin repuesto"]);
        let args = cli.command.args();
        assert_eq!(args["task"]["command"]["block"]["reason"], "sin repuesto");
    }
}

//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`CrewtaskConfig`] struct mirroring the file
//! - Conversion to/from KDL documents
//! - Validation and merging

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::Serialize;

use crate::models::{Context, Priority};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted by `ct config set`.
pub const CONFIG_KEYS: [&str; 6] = [
    "viewer",
    "context",
    "output-format",
    "default-priority",
    "log-level",
    "action-log",
];

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// viewer "ana"
/// context "work"          // or "personal"
/// output-format "human"   // or "json"
/// default-priority "high"
/// log-level "info"
/// action-log #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrewtaskConfig {
    /// User id commands act as
    pub viewer: Option<String>,

    /// Active context for scoped views
    pub context: Option<Context>,

    pub output_format: Option<OutputFormat>,

    /// Priority for tasks created without one
    pub default_priority: Option<Priority>,

    /// Tracing filter when `CT_LOG` is unset
    pub log_level: Option<String>,

    /// Record executed commands in actions.jsonl
    pub action_log: Option<bool>,
}

fn first_string<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a str> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
}

fn string_node(key: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

impl CrewtaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(viewer) = &self.viewer {
            if viewer.trim().is_empty() {
                return Err("viewer must not be empty".to_string());
            }
        }
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join("/"),
                    level
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown or malformed values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();
        config.viewer = first_string(doc, "viewer").map(str::to_string);
        config.context = first_string(doc, "context").and_then(Context::parse);
        config.output_format = first_string(doc, "output-format").and_then(OutputFormat::parse);
        config.default_priority = first_string(doc, "default-priority").and_then(Priority::parse);
        config.log_level = first_string(doc, "log-level").map(|s| s.to_lowercase());

        if let Some(node) = doc.get("action-log") {
            if let Some(entry) = node.entries().first() {
                config.action_log = entry.value().as_bool();
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(viewer) = &self.viewer {
            doc.nodes_mut().push(string_node("viewer", viewer));
        }
        if let Some(context) = &self.context {
            doc.nodes_mut().push(string_node("context", context.as_str()));
        }
        if let Some(format) = &self.output_format {
            doc.nodes_mut().push(string_node("output-format", format.as_str()));
        }
        if let Some(priority) = &self.default_priority {
            doc.nodes_mut().push(string_node("default-priority", priority.as_str()));
        }
        if let Some(level) = &self.log_level {
            doc.nodes_mut().push(string_node("log-level", level));
        }
        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            doc.nodes_mut().push(node);
        }
        doc
    }

    /// Set one key from its textual value, as given to `ct config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "viewer" => self.viewer = Some(value.trim().to_string()),
            "context" => {
                self.context = Some(
                    Context::parse(value)
                        .ok_or_else(|| format!("context must be work or personal, got {}", value))?,
                )
            }
            "output-format" => {
                self.output_format = Some(
                    OutputFormat::parse(value)
                        .ok_or_else(|| format!("output-format must be json or human, got {}", value))?,
                )
            }
            "default-priority" => {
                self.default_priority = Some(Priority::parse(value).ok_or_else(|| {
                    format!("default-priority must be low, medium or high, got {}", value)
                })?)
            }
            "log-level" => self.log_level = Some(value.trim().to_lowercase()),
            "action-log" => {
                self.action_log = Some(match value.to_lowercase().as_str() {
                    "true" | "on" | "yes" => true,
                    "false" | "off" | "no" => false,
                    _ => return Err(format!("action-log must be true or false, got {}", value)),
                })
            }
            _ => {
                return Err(format!(
                    "unknown config key {} (expected one of {})",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        self.validate()
    }
}

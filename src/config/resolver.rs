//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`CT_USER`, `CT_CONTEXT`)
//! 3. Data-dir config.kdl (`$CT_DATA_DIR/config.kdl`)
//! 4. System config.kdl (`~/.config/crewtask/config.kdl`)
//! 5. Built-in defaults

use serde::Serialize;
use std::path::Path;

use crate::Result;
use crate::config::{CrewtaskConfig, OutputFormat, read_config, system_config_path};
use crate::models::{Context, Priority};

/// Environment variable naming the acting user.
pub const USER_ENV: &str = "CT_USER";

/// Environment variable selecting the active context.
pub const CONTEXT_ENV: &str = "CT_CONTEXT";

/// Viewer used when nothing else names one.
pub const DEFAULT_VIEWER: &str = "me";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the data directory's config.kdl
    DataDir,
    /// Value from the system config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::DataDir => write!(f, "data-dir"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub viewer: Resolved<String>,
    pub context: Resolved<Context>,
    pub output_format: Resolved<OutputFormat>,
    pub default_priority: Resolved<Priority>,
    pub log_level: Option<Resolved<String>>,
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            viewer: Resolved::new(DEFAULT_VIEWER.to_string(), ValueSource::Default),
            context: Resolved::new(Context::Work, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            default_priority: Resolved::new(Priority::Medium, ValueSource::Default),
            log_level: None,
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn viewer(&self) -> &str {
        &self.viewer.value
    }

    pub fn context(&self) -> Context {
        self.context.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn default_priority(&self) -> Priority {
        self.default_priority.value
    }

    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_ref().map(|r| r.value.as_str())
    }

    pub fn action_log(&self) -> bool {
        self.action_log.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub viewer: Option<String>,
    pub context: Option<Context>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Environment values relevant to resolution, captured once.
#[derive(Debug, Clone, Default)]
pub struct EnvValues {
    pub user: Option<String>,
    pub context: Option<String>,
}

impl EnvValues {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            user: read(USER_ENV),
            context: read(CONTEXT_ENV),
        }
    }
}

/// Resolve configuration for `data_dir` with the full precedence chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => read_config(&path)?,
        None => CrewtaskConfig::default(),
    };
    let local = read_config(&crate::config::data_config_path(data_dir))?;
    Ok(resolve_layers(&system, &local, &EnvValues::from_env(), overrides))
}

/// Pick the winning layer for every key.
pub fn resolve_layers(
    system: &CrewtaskConfig,
    local: &CrewtaskConfig,
    env: &EnvValues,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    // Resolve viewer
    if let Some(viewer) = &overrides.viewer {
        result.viewer = Resolved::new(viewer.clone(), ValueSource::CliFlag);
    } else if let Some(user) = &env.user {
        result.viewer = Resolved::new(user.clone(), ValueSource::EnvVar(USER_ENV.to_string()));
    } else if let Some(viewer) = &local.viewer {
        result.viewer = Resolved::new(viewer.clone(), ValueSource::DataDir);
    } else if let Some(viewer) = &system.viewer {
        result.viewer = Resolved::new(viewer.clone(), ValueSource::System);
    }

    // Resolve context; an unparseable CT_CONTEXT is skipped
    if let Some(context) = overrides.context {
        result.context = Resolved::new(context, ValueSource::CliFlag);
    } else if let Some(context) = env.context.as_deref().and_then(Context::parse) {
        result.context = Resolved::new(context, ValueSource::EnvVar(CONTEXT_ENV.to_string()));
    } else if let Some(context) = local.context {
        result.context = Resolved::new(context, ValueSource::DataDir);
    } else if let Some(context) = system.context {
        result.context = Resolved::new(context, ValueSource::System);
    }

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = local.output_format {
        result.output_format = Resolved::new(format, ValueSource::DataDir);
    } else if let Some(format) = system.output_format {
        result.output_format = Resolved::new(format, ValueSource::System);
    }

    if let Some(priority) = local.default_priority {
        result.default_priority = Resolved::new(priority, ValueSource::DataDir);
    } else if let Some(priority) = system.default_priority {
        result.default_priority = Resolved::new(priority, ValueSource::System);
    }

    if let Some(level) = &local.log_level {
        result.log_level = Some(Resolved::new(level.clone(), ValueSource::DataDir));
    } else if let Some(level) = &system.log_level {
        result.log_level = Some(Resolved::new(level.clone(), ValueSource::System));
    }

    if let Some(enabled) = local.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::DataDir);
    } else if let Some(enabled) = system.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::System);
    }

    result
}

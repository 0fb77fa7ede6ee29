//! Configuration for Crewtask.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `$CT_CONFIG_DIR/config.kdl`, else `~/.config/crewtask/config.kdl`
//! - Data dir: `$CT_DATA_DIR/config.kdl`, else `~/.local/share/crewtask/config.kdl`
//!
//! Contains `viewer`, `context`, `output-format`, `default-priority`,
//! `log-level` and `action-log`. See [`schema::CrewtaskConfig`].
//!
//! ## Precedence
//!
//! CLI flag > environment > data-dir config > system config > defaults.
//! Use the [`resolver`] module for resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONTEXT_ENV, ConfigOverrides, DEFAULT_VIEWER, EnvValues, Resolved, ResolvedConfig, USER_ENV,
    ValueSource, resolve_config, resolve_layers,
};
pub use schema::{CONFIG_KEYS, CrewtaskConfig, OutputFormat};

use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "CT_CONFIG_DIR";

const CONFIG_FILE: &str = "config.kdl";

/// Path of the system-wide config.kdl, if a config directory is known.
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }
    }
    dirs::config_dir().map(|d| d.join("crewtask").join(CONFIG_FILE))
}

/// Path of the data directory's config.kdl.
pub fn data_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Read a config file. A missing file is an empty config.
pub fn read_config(path: &Path) -> Result<CrewtaskConfig> {
    if !path.exists() {
        return Ok(CrewtaskConfig::default());
    }
    let text = fs::read_to_string(path)?;
    let doc: KdlDocument = text.parse()?;
    let config = CrewtaskConfig::from_kdl(&doc);
    config
        .validate()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

/// Write a config file, creating its directory.
pub fn write_config(path: &Path, config: &CrewtaskConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Context;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = read_config(&dir.path().join("config.kdl")).unwrap();
        assert_eq!(config, CrewtaskConfig::default());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = data_config_path(&dir.path().join("nested"));
        let mut config = CrewtaskConfig::new();
        config.set("viewer", "ana").unwrap();
        config.set("context", "personal").unwrap();
        write_config(&path, &config).unwrap();

        let back = read_config(&path).unwrap();
        assert_eq!(back.viewer.as_deref(), Some("ana"));
        assert_eq!(back.context, Some(Context::Personal));
    }

    #[test]
    fn test_invalid_kdl_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");
        fs::write(&path, "viewer \"unterminated").unwrap();
        assert!(matches!(read_config(&path), Err(Error::Config(_))));
    }

    #[test]
    #[serial_test::serial]
    fn test_system_path_follows_env() {
        let dir = TempDir::new().unwrap();
        // SAFETY: serialized with every other test touching the process env
        unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };
        assert_eq!(system_config_path(), Some(dir.path().join(CONFIG_FILE)));
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
    }
}

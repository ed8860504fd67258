//! Runtime configuration.
//!
//! Library code receives a [`Config`] explicitly. [`Config::from_env`] is the
//! only place that consults the process environment.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SKILLSYNC_HOME";

/// Data directory name under the home directory.
pub const DEFAULT_DATA_DIR: &str = ".skillsync";

/// Paths every component derives its locations from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// User home; user-scope skill roots live below it.
    pub home_dir: PathBuf,
    /// Base directory of the backup store.
    pub data_dir: PathBuf,
    /// `installed_plugins.json` written by Claude Code.
    pub plugin_manifest: PathBuf,
    /// Root of the Claude Code plugin cache.
    pub plugin_cache: PathBuf,
}

impl Config {
    /// The conventional layout under an explicit home directory.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref().to_path_buf();
        let plugins = home.join(".claude").join("plugins");
        Self {
            data_dir: home.join(DEFAULT_DATA_DIR),
            plugin_manifest: plugins.join("installed_plugins.json"),
            plugin_cache: plugins.join("cache"),
            home_dir: home,
        }
    }

    /// Build the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        let mut config = Self::with_home(home);
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Override the backup base directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

use crate::components::{LoggingConfig, StorageConfig};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding [`StorageConfig::path`]
pub const ENV_DB_PATH: &str = "CAMPUS_DB_PATH";
/// Environment variable overriding [`LoggingConfig::level`]
pub const ENV_LOG_LEVEL: &str = "CAMPUS_LOG_LEVEL";
/// Environment variable overriding [`StorageConfig::busy_timeout_ms`]
pub const ENV_BUSY_TIMEOUT_MS: &str = "CAMPUS_BUSY_TIMEOUT_MS";
/// When set, the user's default config file is ignored
pub const ENV_TEST_MODE: &str = "CAMPUS_TEST_MODE";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusConfig {
    /// Database settings
    pub storage: StorageConfig,
    /// Tracing settings
    pub logging: LoggingConfig,
}

/// Command-line values that win over file and environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// `--db`
    pub db_path: Option<PathBuf>,
    /// `--log-level`
    pub log_level: Option<String>,
}

impl CampusConfig {
    /// Load configuration with precedence: defaults < file < env < overrides
    pub fn load(config_file: Option<PathBuf>, overrides: ConfigOverrides) -> ConfigResult<Self> {
        let mut config = Self::from_file_or_default(config_file)?;
        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(path) = overrides.db_path {
            config.storage.path = path;
        }
        if let Some(level) = overrides.log_level {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location (`~/.config/campus/config.toml`)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("campus").join("config.toml"))
    }

    fn from_file_or_default(config_file: Option<PathBuf>) -> ConfigResult<Self> {
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading config file");
            return Self::from_file(&path);
        }

        if std::env::var_os(ENV_TEST_MODE).is_some() {
            return Ok(Self::default());
        }

        match Self::default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                debug!(path = %path.display(), "Loading default config file");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.storage.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// The configuration as TOML
    pub fn display_as_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// The configuration as JSON
    pub fn display_as_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

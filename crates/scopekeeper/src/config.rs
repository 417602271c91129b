//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mrn::{MrnScheme, DEFAULT_AUTHORITY};

pub const ENV_AUTHORITY: &str = "SCOPEKEEPER_AUTHORITY";
pub const ENV_SPACE: &str = "SCOPEKEEPER_SPACE";
pub const ENV_TIMEOUT_SECS: &str = "SCOPEKEEPER_TIMEOUT_SECS";
pub const ENV_LOG: &str = "SCOPEKEEPER_LOG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settings shared by every controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Authority prefix of every MRN, e.g. `//captain.api.mondoo.app`.
    #[serde(default = "default_authority")]
    pub authority: String,

    /// Space used when a declaration names none.
    #[serde(default)]
    pub default_space_id: Option<String>,

    /// Budget for one operation when the caller gives no deadline.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fire the kind's scan/import action after a create.
    #[serde(default = "default_true")]
    pub post_create_trigger: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            default_space_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            post_create_trigger: true,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `scopekeeper=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// `<config dir>/scopekeeper/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scopekeeper").join("config.yaml"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = if content.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists (defaults otherwise), then applies
    /// environment overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            EngineConfig::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `SCOPEKEEPER_*` names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(authority) = lookup(ENV_AUTHORITY) {
            self.authority = authority;
        }
        if let Some(space) = lookup(ENV_SPACE) {
            self.default_space_id = Some(space).filter(|s| !s.is_empty());
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: ENV_TIMEOUT_SECS.to_string(),
                        message: e.to_string(),
                    })?;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.authority.starts_with("//") {
            return Err(ConfigError::InvalidValue {
                key: "authority".to_string(),
                message: format!("'{}' must start with '//'", self.authority),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "requestTimeoutSecs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scheme(&self) -> MrnScheme {
        MrnScheme::new(self.authority.as_str())
    }
}

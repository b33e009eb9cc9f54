//! Gateway configuration and file loading

use crate::filter::FilterConfig;
use crate::policy::{PolicyMode, Whitelist};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound applied to any requested timeout unless configured otherwise
pub const DEFAULT_MAX_TIMEOUT_SECS: u64 = 300;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Gateway configuration, fixed for the lifetime of a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Policy mode
    pub mode: PolicyMode,

    /// Timeout used when a request carries none; `None` means the mode default
    pub default_timeout_secs: Option<u64>,

    /// Ceiling for any requested timeout
    pub max_timeout_secs: u64,

    /// Approved base commands (whitelisted mode only)
    pub whitelist: Whitelist,

    /// Argument filter limits (whitelisted mode only)
    pub filter: FilterConfig,

    /// `PATH`-style override for binary resolution
    pub search_path: Option<String>,

    /// Working directory for spawned commands
    pub working_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::whitelisted()
    }
}

impl GatewayConfig {
    /// Trust-the-caller configuration: every command goes through the shell
    pub fn unrestricted() -> Self {
        Self {
            mode: PolicyMode::Unrestricted,
            ..Self::whitelisted()
        }
    }

    /// Stock whitelist with the standard argument filter
    pub fn whitelisted() -> Self {
        Self {
            mode: PolicyMode::Whitelisted,
            default_timeout_secs: None,
            max_timeout_secs: DEFAULT_MAX_TIMEOUT_SECS,
            whitelist: Whitelist::default(),
            filter: FilterConfig::default(),
            search_path: None,
            working_dir: None,
        }
    }

    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Timeout applied when a request does not specify one
    pub fn effective_default_timeout(&self) -> u64 {
        self.default_timeout_secs
            .unwrap_or_else(|| self.mode.default_timeout_secs())
    }

    /// Clamp a requested timeout into `1..=max_timeout_secs`
    pub fn clamp_timeout(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or_else(|| self.effective_default_timeout())
            .clamp(1, self.max_timeout_secs.max(1))
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "max_timeout_secs must be positive".to_string(),
            ));
        }

        if let Some(default) = self.default_timeout_secs {
            if default == 0 {
                return Err(ConfigError::Invalid(
                    "default_timeout_secs must be positive".to_string(),
                ));
            }
            if default > self.max_timeout_secs {
                return Err(ConfigError::Invalid(format!(
                    "default_timeout_secs {} exceeds max_timeout_secs {}",
                    default, self.max_timeout_secs
                )));
            }
        }

        if self.filter.max_arg_len == 0 {
            return Err(ConfigError::Invalid(
                "filter.max_arg_len must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Load from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Export to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            Some("json") => Self::from_json(&contents),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

//! User configuration for the Rekog CLI.
//!
//! Settings are read from a JSON file (`~/.config/rekog/config.json` on most
//! platforms, overridable through `REKOG_CONFIG_PATH`), then overlaid with
//! environment variables. Command-line flags are applied last by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rekog_api::ClientSettings;
use rekog_util::resolve_config_path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable allowing callers to override the config file path.
pub const CONFIG_PATH_ENV: &str = "REKOG_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENDPOINT_URL_ENV: &str = "REKOG_ENDPOINT_URL";
pub const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RekogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent_suffix: Option<String>,
}

impl RekogConfig {
    /// Load the config file from its default location. A missing file yields
    /// the default config.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = default_config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_error)
    }

    /// Overlay `AWS_REGION` (or `AWS_DEFAULT_REGION`) and `REKOG_ENDPOINT_URL`.
    pub fn with_env_overrides(mut self) -> Self {
        let non_blank = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());
        if let Some(region) = non_blank("AWS_REGION").or_else(|| non_blank("AWS_DEFAULT_REGION")) {
            self.region = Some(region);
        }
        if let Some(endpoint) = non_blank(ENDPOINT_URL_ENV) {
            self.endpoint_url = Some(endpoint);
        }
        self
    }

    /// Settings for building the HTTP client.
    pub fn client_settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::for_region(self.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()));
        settings.endpoint_url = self.endpoint_url.clone();
        settings.timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        settings.user_agent_suffix = self.user_agent_suffix.clone();
        settings
    }
}

/// Get the default path for the config file.
pub fn default_config_path() -> PathBuf {
    resolve_config_path(CONFIG_PATH_ENV, CONFIG_FILE_NAME)
}

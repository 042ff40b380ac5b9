//! Configuration file support for flakedeps
//!
//! Reads configuration from `~/.config/flakedeps/config.json`:
//!
//! ```json
//! {
//!   "registry_url": "https://api.flakehub.com",
//!   "cache_ttl_minutes": 60,
//!   "timeout_secs": 30
//! }
//! ```

use crate::nix::flakehub::DEFAULT_REGISTRY_URL;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("flakedeps/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine config directory. HOME environment variable not set.")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// FlakeHub API base URL
    pub registry_url: String,

    /// How long registry responses stay fresh on disk; 0 disables the disk cache
    pub cache_ttl_minutes: u64,

    /// Whole-request timeout for registry calls
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path or return defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::ParseError { path, source })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns the config file path: `~/.config/flakedeps/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    // Use XDG_CONFIG_HOME if set, otherwise fall back to ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".config"))
                .unwrap_or_default()
        });

    if config_base.as_os_str().is_empty() {
        return Err(ConfigError::NoConfigDir);
    }

    Ok(config_base.join("flakedeps").join("config.json"))
}

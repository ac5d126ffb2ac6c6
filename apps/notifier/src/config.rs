//! Notifier configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Notifier configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Base URL of the portal REST API the hub endpoint is derived from,
    /// e.g. `https://portal.example.com/api/v1`.
    /// Override: `CHIME_API_BASE_URL`
    pub api_base_url: String,

    /// Access token presented during the hub handshake. Re-read from this
    /// value on every reconnect attempt.
    /// Override: `CHIME_ACCESS_TOKEN`
    pub access_token: Option<String>,

    /// Notification groups to join whenever a session is established.
    pub groups: Vec<String>,

    /// Seconds between keepalive pings on an idle session.
    /// Override: `CHIME_KEEPALIVE_INTERVAL`
    pub keepalive_interval_secs: u64,

    /// Directory for persistent data (preference record).
    /// Override: `CHIME_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        let core = chime_core::Config::default();
        Self {
            api_base_url: "http://localhost:5000/api/v1".to_string(),
            access_token: None,
            groups: Vec::new(),
            keepalive_interval_secs: core.keepalive_interval_secs,
            data_dir: None,
        }
    }
}

impl NotifierConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CHIME_API_BASE_URL") {
            if !val.trim().is_empty() {
                self.api_base_url = val;
            }
        }

        if let Ok(val) = std::env::var("CHIME_ACCESS_TOKEN") {
            if !val.is_empty() {
                self.access_token = Some(val);
            }
        }

        if let Ok(val) = std::env::var("CHIME_KEEPALIVE_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.keepalive_interval_secs = secs;
            }
        }

        // Note: CHIME_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to chime-core's Config type.
    pub fn to_core_config(&self) -> chime_core::Config {
        chime_core::Config {
            api_base_url: self.api_base_url.clone(),
            data_dir: self.data_dir.clone(),
            keepalive_interval_secs: self.keepalive_interval_secs,
            ..Default::default()
        }
    }
}

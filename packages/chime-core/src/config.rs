//! Library configuration.
//!
//! [`Config`] is the embedder-facing knob set: where the portal backend
//! lives, where preferences persist, and channel capacities. Everything that
//! is part of the hub contract (reconnect schedule, hub path, dedup horizon)
//! lives in [`crate::constants`] instead and is deliberately not
//! configurable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMAND_CHANNEL_CAPACITY, EVENT_CHANNEL_CAPACITY, KEEPALIVE_INTERVAL_SECS,
};

/// Configuration for the Chime core services.
///
/// All fields except `api_base_url` have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of the portal REST API the hub endpoint is derived from,
    /// e.g. `https://portal.example.com/api/v1`.
    pub api_base_url: String,

    /// Directory for persisted preferences (None = in-memory only).
    pub data_dir: Option<PathBuf>,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,

    /// Interval between keep-alive pings while connected (seconds).
    pub keepalive_interval_secs: u64,

    /// Capacity of the outbound invocation channel.
    pub command_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            data_dir: None,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            keepalive_interval_secs: KEEPALIVE_INTERVAL_SECS,
            command_channel_capacity: COMMAND_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Creates a config for the given portal backend, defaults elsewhere.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.trim().is_empty() {
            return Err("api_base_url must be set".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.keepalive_interval_secs == 0 {
            return Err("keepalive_interval_secs must be >= 1".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("command_channel_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}

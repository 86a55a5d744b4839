//! Pilot configuration from environment.

use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8765";
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_url: String,
    pub status_interval_ms: u64,
    /// `EnvFilter` directives; `None` keeps the built-in default.
    pub log_filter: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            server_url: var("DRONE_SERVER_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            status_interval_ms: var("DRONE_STATUS_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STATUS_INTERVAL_MS),
            log_filter: var("DRONE_LOG"),
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

//! Configuration model for testdeck (`config.toml`).
//!
//! Every field has a default, so a missing or partial file is valid.

use crate::error::{Result, TestdeckError};
use crate::session::MIN_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 1500;
pub const DEFAULT_SIMULATED_REPLY: &str = "Test generation completed. Running automated tests...";
pub const DEFAULT_CANCELLED_MESSAGE: &str = "cancelled";
pub const DEFAULT_API_KEY_ENV: &str = "TESTDECK_ENGINE_TOKEN";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LogSettings,
}

impl RootConfig {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.session.engine_timeout_secs == 0 {
            return Err(TestdeckError::config(
                "session.engine_timeout_secs must be greater than zero",
            ));
        }
        if let Some(capacity) = self.session.history_capacity {
            if capacity < MIN_HISTORY_CAPACITY {
                return Err(TestdeckError::config(format!(
                    "session.history_capacity must be at least {} (got {})",
                    MIN_HISTORY_CAPACITY, capacity
                )));
            }
        }
        if self.engine.kind == EngineKind::Http
            && self.engine.endpoint.as_deref().is_none_or(|e| e.trim().is_empty())
        {
            return Err(TestdeckError::config(
                "engine.endpoint is required when engine.kind = \"http\"",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Upper bound on one engine dispatch.
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,
    /// Keep at most this many log entries (oldest evicted first).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_capacity: Option<usize>,
    /// Engine entry appended when a request is cancelled.
    #[serde(default = "default_cancelled_message")]
    pub cancelled_message: String,
}

impl SessionSettings {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            engine_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            history_capacity: None,
            cancelled_message: DEFAULT_CANCELLED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// In-process stand-in that replies after a fixed delay.
    #[default]
    Simulated,
    /// Remote engine reached over HTTP.
    Http,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Simulated => f.write_str("simulated"),
            EngineKind::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub kind: EngineKind,
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
    #[serde(default = "default_simulated_reply")]
    pub simulated_reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kind: EngineKind::Simulated,
            simulated_delay_ms: DEFAULT_SIMULATED_DELAY_MS,
            simulated_reply: DEFAULT_SIMULATED_REPLY.to_string(),
            endpoint: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive when `TESTDECK_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_engine_timeout_secs() -> u64 {
    DEFAULT_ENGINE_TIMEOUT_SECS
}

fn default_cancelled_message() -> String {
    DEFAULT_CANCELLED_MESSAGE.to_string()
}

fn default_simulated_delay_ms() -> u64 {
    DEFAULT_SIMULATED_DELAY_MS
}

fn default_simulated_reply() -> String {
    DEFAULT_SIMULATED_REPLY.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config, RootConfig::default());
        assert_eq!(config.session.engine_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config: RootConfig = toml::from_str(
            r#"
            [session]
            history_capacity = 50

            [engine]
            kind = "http"
            endpoint = "http://localhost:8080/generate"
            "#,
        )
        .unwrap();
        assert_eq!(config.session.history_capacity, Some(50));
        assert_eq!(config.session.cancelled_message, "cancelled");
        assert_eq!(config.engine.kind, EngineKind::Http);
        assert_eq!(config.engine.simulated_delay_ms, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RootConfig::default();
        config.session.engine_timeout_secs = 0;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = RootConfig::default();
        config.session.history_capacity = Some(1);
        assert!(config.validate().unwrap_err().is_config());

        let mut config = RootConfig::default();
        config.engine.kind = EngineKind::Http;
        assert!(config.validate().unwrap_err().is_config());
    }
}

//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading (`.gepa/config.yaml`, `.gepa/local.yaml`)
//! - Environment variable overrides (`GEPA_*`)
//! - Configuration validation

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::domain::models::SearchConfig;

pub use loader::{ConfigError, ConfigLoader};

/// Top-level configuration for a Gepa host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GepaConfig {
    /// Search engine knobs.
    pub search: SearchConfig,
    /// Anthropic adapter settings.
    pub llm: LlmSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Settings for the Anthropic adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_concurrent_requests: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_secs: 300,
            max_retries: 3,
            max_concurrent_requests: 4,
        }
    }
}

/// Logging settings consumed by `infrastructure::logging::init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// One of: pretty, json.
    pub format: String,
    /// When set, logs also go to a daily-rotated file in this directory.
    pub log_dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_dir: None,
        }
    }
}

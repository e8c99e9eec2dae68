//! Hierarchical configuration loading with figment.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::GepaConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("llm model must not be empty")]
    EmptyModel,

    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.gepa/config.yaml` (project config)
    /// 3. `.gepa/local.yaml` (local overrides, optional)
    /// 4. Environment variables (`GEPA_*` prefix, `__` as section separator)
    pub fn load() -> Result<GepaConfig> {
        let config: GepaConfig = Figment::new()
            .merge(Serialized::defaults(GepaConfig::default()))
            .merge(Yaml::file(".gepa/config.yaml"))
            .merge(Yaml::file(".gepa/local.yaml"))
            .merge(Env::prefixed("GEPA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<GepaConfig> {
        let config: GepaConfig = Figment::new()
            .merge(Serialized::defaults(GepaConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &GepaConfig) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.llm.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        config
            .search
            .clone()
            .normalized()
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;

        Ok(())
    }
}

//! Backend configuration
//!
//! Settings for reaching the hosted auth/data service, read from
//! `TASKBOARD_*` environment variables through the `config` crate.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BackendError, BackendResult};

const ENV_PREFIX: &str = "TASKBOARD";
const DEFAULT_URL: &str = "http://localhost:54321";
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Which backend implementation the client talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// The hosted service over HTTP
    #[default]
    Rest,
    /// A process-local store, nothing leaves the machine
    Memory,
}

/// Backend configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted project
    pub url: String,
    /// Public (anon) API key sent with every request
    pub anon_key: String,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Backend implementation
    pub mode: BackendMode,
}

impl BackendConfig {
    /// Create a new BackendConfig from environment variables
    ///
    /// # Environment Variables
    /// - `TASKBOARD_URL`: project base URL (default: "http://localhost:54321")
    /// - `TASKBOARD_ANON_KEY`: anon API key, required in `rest` mode
    /// - `TASKBOARD_REQUEST_TIMEOUT`: request timeout in seconds (default: 30)
    /// - `TASKBOARD_MODE`: `rest` or `memory` (default: `rest`)
    pub fn from_env() -> BackendResult<Self> {
        let settings = Config::builder()
            .set_default("url", DEFAULT_URL)
            .and_then(|b| b.set_default("anon_key", ""))
            .and_then(|b| b.set_default("request_timeout", DEFAULT_REQUEST_TIMEOUT))
            .and_then(|b| b.set_default("mode", "rest"))
            .map_err(config_error)?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(config_error)?;

        let config: BackendConfig = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for the in-memory backend
    pub fn memory() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            anon_key: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            mode: BackendMode::Memory,
        }
    }

    /// Check that the settings can reach a hosted project
    pub fn validate(&self) -> BackendResult<()> {
        if self.mode == BackendMode::Memory {
            return Ok(());
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(BackendError::Configuration(format!(
                "Invalid backend URL: {}",
                self.url
            )));
        }

        if self.anon_key.trim().is_empty() {
            return Err(BackendError::Configuration(
                "TASKBOARD_ANON_KEY is required in rest mode".to_string(),
            ));
        }

        Ok(())
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn config_error(err: ConfigError) -> BackendError {
    BackendError::Configuration(err.to_string())
}

//! Client configuration: service location, per-attempt timeout and retry policy.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::strings::StringPresence;

/// Default service URL used when no configuration file is given.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:3000";

/// Errors raised while resolving or validating client configuration.
///
/// These are fatal: they are reported before any request is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The options carry no `RetryPolicy` section.
    MissingRetryPolicy,
    /// `ServiceUrl` is missing, empty or blank.
    MissingServiceUrl,
    /// `BackoffPower` is zero, negative or not a finite number.
    InvalidBackoffPower(f64),
    /// `TimeOut` is zero, negative or not a finite number.
    InvalidTimeout(f64),
    /// The configuration document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingRetryPolicy => {
                write!(f, "Client options have no RetryPolicy configured")
            }
            ConfigError::MissingServiceUrl => {
                write!(f, "ServiceUrl is not set. Use --url or the GOTENBERG_URL environment variable.")
            }
            ConfigError::InvalidBackoffPower(power) => {
                write!(f, "BackoffPower must be a positive number, got {}", power)
            }
            ConfigError::InvalidTimeout(secs) => {
                write!(f, "TimeOut must be a positive number of seconds, got {}", secs)
            }
            ConfigError::Parse(msg) => {
                write!(f, "Invalid client options: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Retry behavior applied to every outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetryOptions {
    /// When false, requests are sent exactly once.
    pub enabled: bool,
    /// Maximum number of retries after the first attempt.
    pub retry_count: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_power: f64,
    /// Emit a diagnostic record for every retry.
    pub logging_enabled: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_count: 3,
            backoff_power: 1.5,
            logging_enabled: true,
        }
    }
}

impl RetryOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backoff_power.is_finite() || self.backoff_power <= 0.0 {
            return Err(ConfigError::InvalidBackoffPower(self.backoff_power));
        }
        Ok(())
    }
}

/// Options for [`crate::http::GotenbergClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientOptions {
    /// Base URL of the conversion service.
    #[serde(default)]
    pub service_url: String,

    /// Per-attempt timeout in seconds.
    #[serde(rename = "TimeOut", default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryOptions>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout_secs: None,
            retry_policy: Some(RetryOptions::default()),
        }
    }
}

impl ClientOptions {
    /// Parses options from a JSON document and validates them.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: ClientOptions =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    ///
    /// The result is not validated, so overrides can be applied first; call
    /// [`ClientOptions::validate`] before use.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading client options from {:?}", path);
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client options from {:?}", path))?;
        let options: ClientOptions = serde_json::from_str(&json)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to load client options from {:?}", path))?;
        Ok(options)
    }

    /// Rejects values the retry policy and client cannot work with.
    ///
    /// A missing `RetryPolicy` is not rejected here: it is reported when a
    /// policy is created for a request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_url.is_absent() {
            return Err(ConfigError::MissingServiceUrl);
        }
        if let Some(secs) = self.timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::InvalidTimeout(secs));
            }
        }
        if let Some(retry) = &self.retry_policy {
            retry.validate()?;
        }
        Ok(())
    }

    /// Per-attempt timeout, if one is configured and representable.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

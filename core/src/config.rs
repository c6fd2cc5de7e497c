//! Client configuration.
//!
//! # Design
//! A `ClientConfig` is fixed at construction. The client wraps it in an
//! `Arc`, so concurrent calls read it without locking. Callers that want one
//! client per serialization mode build one config per mode; there is no
//! process-wide default instance.

use std::env;
use std::fmt;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

pub const BASE_URL_VAR: &str = "API_BASE_URL";
pub const TIMEOUT_VAR: &str = "API_TIMEOUT_MS";

/// How request bodies are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationMode {
    /// JSON text.
    Structured,
    /// `application/x-www-form-urlencoded` with bracket paths.
    UrlEncoded,
    /// `multipart/form-data` with bracket paths.
    Multipart,
}

impl fmt::Display for SerializationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SerializationMode::Structured => "structured",
            SerializationMode::UrlEncoded => "url-encoded",
            SerializationMode::Multipart => "multipart",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    mode: SerializationMode,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, mode: SerializationMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            mode,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the default per-call timeout. `Duration::ZERO` disables it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from `API_BASE_URL` and, optionally, `API_TIMEOUT_MS`.
    pub fn from_env(mode: SerializationMode) -> Result<Self, ConfigError> {
        let base_url = env::var(BASE_URL_VAR).map_err(|_| ConfigError::MissingVar(BASE_URL_VAR))?;
        Url::parse(&base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            source,
        })?;

        let timeout = match env::var(TIMEOUT_VAR) {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_millis).unwrap_or_else(|_| {
                warn!(value = %raw, "invalid {TIMEOUT_VAR}, using default");
                DEFAULT_TIMEOUT
            }),
            Err(_) => DEFAULT_TIMEOUT,
        };

        let config = Self::new(&base_url, mode).with_timeout(timeout);
        info!(
            base_url = %config.base_url,
            %mode,
            timeout_ms = timeout.as_millis() as u64,
            "client configuration loaded"
        );
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mode(&self) -> SerializationMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_seconds() {
        let config = ClientConfig::new("http://localhost:8000", SerializationMode::Structured);
        assert_eq!(config.timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:8000/api/", SerializationMode::Multipart);
        assert_eq!(config.base_url(), "http://localhost:8000/api");
    }

    // Env-based loading lives in one test so parallel tests never race on
    // the same variables.
    #[test]
    fn from_env_reads_and_validates() {
        env::remove_var(BASE_URL_VAR);
        env::remove_var(TIMEOUT_VAR);
        assert!(matches!(
            ClientConfig::from_env(SerializationMode::Structured),
            Err(ConfigError::MissingVar(BASE_URL_VAR))
        ));

        env::set_var(BASE_URL_VAR, "not a url");
        assert!(matches!(
            ClientConfig::from_env(SerializationMode::Structured),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        env::set_var(BASE_URL_VAR, "https://api.example.com/");
        env::set_var(TIMEOUT_VAR, "1500");
        let config = ClientConfig::from_env(SerializationMode::UrlEncoded).unwrap();
        assert_eq!(config.base_url(), "https://api.example.com");
        assert_eq!(config.timeout(), Duration::from_millis(1500));

        env::set_var(TIMEOUT_VAR, "soon");
        let config = ClientConfig::from_env(SerializationMode::UrlEncoded).unwrap();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);

        env::remove_var(BASE_URL_VAR);
        env::remove_var(TIMEOUT_VAR);
    }
}

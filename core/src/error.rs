//! Error types for the API client.
//!
//! # Design
//! `ApiError` is the error half of every `ResponseEnvelope`: it is data, not
//! something the client returns through `Err`. Status `0` is reserved for
//! calls that never produced an HTTP response. `TransportError` is what a
//! `Transport` reports back to the dispatch, and keeps cancellation apart
//! from generic network failure so the two surface with different messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::AbortReason;

/// Status reported when no HTTP response was received.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Normalized failure carried by `ResponseEnvelope::Failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("HTTP {status}: {message}")]
pub struct ApiError {
    /// HTTP status, or `0` when the call never got a response.
    pub status: u16,

    /// Display message extracted from the payload.
    pub message: String,

    /// Raw detail payload for programmatic use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// True when the call failed before any HTTP response arrived.
    pub fn is_transport(&self) -> bool {
        self.status == NO_RESPONSE_STATUS
    }
}

/// Failures a `Transport` reports instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The composite cancellation signal fired before a response arrived.
    #[error("request aborted: {0}")]
    Aborted(AbortReason),

    /// Connection, DNS, TLS or I/O failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Errors raised while loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

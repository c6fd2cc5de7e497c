//! The client façade.
//!
//! # Design
//! `Client` holds an immutable `ClientConfig` and a `Transport`. Every verb
//! method builds a `RequestDescriptor` and goes through `send`, which:
//! 1. builds the `HttpRequest` (`build_request`, pure and testable alone),
//! 2. opens a `CancelScope` for the call's timeout and caller signal,
//! 3. runs the transport inside the scope,
//! 4. normalizes the outcome into a `ResponseEnvelope`.
//!
//! No step returns early with an error: a body that cannot be serialized,
//! a dropped connection and a 500 all come back as envelopes.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::body::serialize_body;
use crate::cancel::{CancelScope, CancelSignal};
use crate::config::ClientConfig;
use crate::error::{ApiError, NO_RESPONSE_STATUS};
use crate::headers::build_headers;
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::query::{encode_query, QueryParams};
use crate::response::{from_transport_error, normalize_response, ResponseEnvelope};
use crate::value::Body;

/// Everything that varies per call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub signal: Option<CancelSignal>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            token: None,
            timeout: None,
            signal: None,
        }
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    /// Per-call timeout, overriding the client default.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// HTTP client bound to one backend and one serialization mode.
#[derive(Debug, Clone)]
pub struct Client<T> {
    config: Arc<ClientConfig>,
    transport: T,
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get<D: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&QueryParams>,
        token: Option<&str>,
    ) -> ResponseEnvelope<D> {
        let query = params.map(encode_query).unwrap_or_default();
        self.send(RequestDescriptor::new(HttpMethod::Get, format!("{path}{query}")).token(token))
            .await
    }

    pub async fn post<D: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<Body>,
        token: Option<&str>,
    ) -> ResponseEnvelope<D> {
        self.send(RequestDescriptor::new(HttpMethod::Post, path).body(body).token(token))
            .await
    }

    pub async fn put<D: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<Body>,
        token: Option<&str>,
    ) -> ResponseEnvelope<D> {
        self.send(RequestDescriptor::new(HttpMethod::Put, path).body(body).token(token))
            .await
    }

    pub async fn patch<D: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<Body>,
        token: Option<&str>,
    ) -> ResponseEnvelope<D> {
        self.send(RequestDescriptor::new(HttpMethod::Patch, path).body(body).token(token))
            .await
    }

    pub async fn delete<D: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> ResponseEnvelope<D> {
        self.send(RequestDescriptor::new(HttpMethod::Delete, path).token(token))
            .await
    }

    pub async fn delete_with_body<D: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<Body>,
        token: Option<&str>,
    ) -> ResponseEnvelope<D> {
        self.send(RequestDescriptor::new(HttpMethod::Delete, path).body(body).token(token))
            .await
    }

    /// Build the wire request for `descriptor` without sending it.
    pub fn build_request(&self, descriptor: RequestDescriptor) -> Result<HttpRequest, ApiError> {
        let mode = self.config.mode();
        let timeout = Some(self.effective_timeout(&descriptor)).filter(|t| !t.is_zero());
        let body = descriptor
            .body
            .map(|body| serialize_body(mode, body))
            .transpose()
            .map_err(|e| ApiError::new(NO_RESPONSE_STATUS, format!("Failed to serialize request body: {e}")))?;

        Ok(HttpRequest {
            method: descriptor.method,
            url: format!("{}{}", self.config.base_url(), descriptor.path),
            headers: build_headers(mode, descriptor.token.as_deref(), &descriptor.headers),
            body,
            timeout,
        })
    }

    fn effective_timeout(&self, descriptor: &RequestDescriptor) -> Duration {
        descriptor.timeout.unwrap_or(self.config.timeout())
    }

    /// Send a fully described request.
    pub async fn send<D: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> ResponseEnvelope<D> {
        let timeout = self.effective_timeout(&descriptor);
        let scope = CancelScope::new(descriptor.signal.clone(), timeout);

        let request = match self.build_request(descriptor) {
            Ok(request) => request,
            Err(error) => return ResponseEnvelope::failure(error),
        };

        debug!(
            method = %request.method,
            url = %request.url,
            timeout_ms = timeout.as_millis() as u64,
            "sending request"
        );

        let signal = scope.signal();
        match scope.run(self.transport.execute(request, signal)).await {
            Ok(response) => {
                debug!(status = response.status, "response received");
                normalize_response(response)
            }
            Err(err) => {
                debug!(error = %err, "request failed before a response");
                from_transport_error(err)
            }
        }
    }
}

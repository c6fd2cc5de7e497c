//! Response normalization.
//!
//! # Design
//! Every call ends in a `ResponseEnvelope`. Transport failures map to status
//! `0`. A 204 short-circuits without reading the body. Otherwise the content
//! type picks JSON or text parsing, and JSON that fails to parse degrades to
//! `null` instead of failing the call.
//!
//! Error messages come from the first usable source: a `detail` field (the
//! shape validation-heavy backends return), then `message`, then the start
//! of a plain-text body, then the status reason phrase.

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{ApiError, TransportError, NO_RESPONSE_STATUS};
use crate::http::HttpResponse;

/// Longest plain-text body used verbatim as an error message.
pub const MAX_TEXT_ERROR_CHARS: usize = 300;

pub const ABORTED_MESSAGE: &str = "Request aborted";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";
pub const NO_CONTENT_MESSAGE: &str = "No Content";
pub const OK_MESSAGE: &str = "OK";
pub const FALLBACK_ERROR_MESSAGE: &str = "Request failed";
pub const UNDECODABLE_MESSAGE: &str = "Invalid response body";

/// Outcome of a client call. Branch on the variant before touching data.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope<T> {
    Success { data: T, message: Option<String> },
    Failure { error: ApiError, message: Option<String> },
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        ResponseEnvelope::Success {
            data,
            message: Some(message.into()),
        }
    }

    /// A failure whose top-level message mirrors the error's.
    pub fn failure(error: ApiError) -> Self {
        let message = Some(error.message.clone());
        ResponseEnvelope::Failure { error, message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ResponseEnvelope::Success { data, .. } => Some(data),
            ResponseEnvelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ResponseEnvelope::Success { .. } => None,
            ResponseEnvelope::Failure { error, .. } => Some(error),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseEnvelope::Success { message, .. } | ResponseEnvelope::Failure { message, .. } => {
                message.as_deref()
            }
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            ResponseEnvelope::Success { data, .. } => Ok(data),
            ResponseEnvelope::Failure { error, .. } => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        match self {
            ResponseEnvelope::Success { data, message } => ResponseEnvelope::Success {
                data: f(data),
                message,
            },
            ResponseEnvelope::Failure { error, message } => ResponseEnvelope::Failure { error, message },
        }
    }
}

impl<T: Serialize> Serialize for ResponseEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let message = self.message();
        let mut state = serializer.serialize_struct("ResponseEnvelope", 3)?;
        match self {
            ResponseEnvelope::Success { data, .. } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ResponseEnvelope::Failure { error, .. } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        match message {
            Some(message) => state.serialize_field("message", message)?,
            None => state.skip_field("message")?,
        }
        state.end()
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Payload::Json(Value::Object(map)) => map.get(name).filter(|v| !v.is_null()),
            _ => None,
        }
    }
}

/// Envelope for a call that never produced a response.
pub fn from_transport_error<T>(err: TransportError) -> ResponseEnvelope<T> {
    let error = match err {
        TransportError::Aborted(reason) => ApiError::new(NO_RESPONSE_STATUS, ABORTED_MESSAGE)
            .with_detail(Value::String(reason.to_string())),
        TransportError::Network(cause) => {
            ApiError::new(NO_RESPONSE_STATUS, NETWORK_ERROR_MESSAGE).with_detail(Value::String(cause))
        }
    };
    ResponseEnvelope::failure(error)
}

/// Turn a received response into an envelope, decoding success data as `T`.
pub fn normalize_response<T: DeserializeOwned>(response: HttpResponse) -> ResponseEnvelope<T> {
    let status = response.status;
    if status == 204 {
        return decode(status, Value::Object(serde_json::Map::new()), NO_CONTENT_MESSAGE.to_string());
    }

    let payload = parse_payload(&response);
    if (200..300).contains(&status) {
        let message = payload
            .field("message")
            .map_or_else(|| OK_MESSAGE.to_string(), value_text);
        let data = match payload {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        };
        return decode(status, data, message);
    }

    ResponseEnvelope::failure(failure_error(status, payload))
}

/// JSON for JSON content types (null when it will not parse), text otherwise.
pub fn parse_payload(response: &HttpResponse) -> Payload {
    if response.content_type().is_some_and(is_json_content_type) {
        Payload::Json(serde_json::from_str(&response.body).unwrap_or(Value::Null))
    } else {
        Payload::Text(response.body.clone())
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn failure_error(status: u16, payload: Payload) -> ApiError {
    let message = error_message(status, &payload);
    let detail = match payload.field("detail") {
        Some(detail) => Some(detail.clone()),
        None => match payload {
            Payload::Json(Value::Null) => None,
            Payload::Json(value) => Some(value),
            Payload::Text(text) if text.is_empty() => None,
            Payload::Text(text) => Some(Value::String(text)),
        },
    };
    ApiError {
        status,
        message,
        detail,
    }
}

/// Best-effort display message for a failed response.
pub fn error_message(status: u16, payload: &Payload) -> String {
    if let Some(detail) = payload.field("detail") {
        return detail_message(detail);
    }
    if let Some(message) = payload.field("message") {
        return value_text(message);
    }
    if let Payload::Text(text) | Payload::Json(Value::String(text)) = payload {
        if !text.is_empty() {
            return text.chars().take(MAX_TEXT_ERROR_CHARS).collect();
        }
    }
    ::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or(FALLBACK_ERROR_MESSAGE)
        .to_string()
}

fn detail_message(detail: &Value) -> String {
    match detail {
        Value::Array(items) => items.iter().map(item_message).collect::<Vec<_>>().join("; "),
        other => item_message(other),
    }
}

/// A string as-is, an object's `msg`, or the value's JSON text.
fn item_message(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("msg")
            .filter(|msg| !msg.is_null())
            .map_or_else(|| item.to_string(), value_text),
        other => other.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Decode success data, retrying from `null` so payloads that do not fit
/// `T` degrade the same way unparseable JSON does.
fn decode<T: DeserializeOwned>(status: u16, data: Value, message: String) -> ResponseEnvelope<T> {
    match serde_json::from_value::<T>(data) {
        Ok(data) => ResponseEnvelope::Success {
            data,
            message: Some(message),
        },
        Err(err) => match serde_json::from_value::<T>(Value::Null) {
            Ok(data) => ResponseEnvelope::Success {
                data,
                message: Some(message),
            },
            Err(_) => ResponseEnvelope::failure(
                ApiError::new(status, UNDECODABLE_MESSAGE).with_detail(Value::String(err.to_string())),
            ),
        },
    }
}

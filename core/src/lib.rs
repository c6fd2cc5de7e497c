//! Envelope-returning HTTP client for a single backend API.
//!
//! # Overview
//! One `Client` per serialization mode talks to one backend. Every call goes
//! through the same pipeline: query encoding, header building, body
//! serialization, a per-call cancellation scope, the transport, and response
//! normalization. Callers always get a `ResponseEnvelope` back and branch on
//! it; nothing escapes as an error or a panic.
//!
//! # Design
//! - `ClientConfig` is immutable and shared through an `Arc`.
//! - `build_request` is pure, so request shape is testable without I/O.
//! - The network sits behind the `Transport` trait. `UreqTransport` (feature
//!   `ureq`, on by default) is the stock implementation.
//! - Cancellation is cooperative: transports watch the composite
//!   `CancelSignal` and report `TransportError::Aborted`.

pub mod body;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod query;
pub mod response;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod value;

pub use cancel::{AbortReason, CancelScope, CancelSignal, Canceller};
pub use client::{Client, RequestDescriptor};
pub use config::{ClientConfig, SerializationMode, DEFAULT_TIMEOUT};
pub use error::{ApiError, ConfigError, TransportError};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
pub use query::{encode_query, QueryParams, QueryValue, Scalar};
pub use response::{ResponseEnvelope, MAX_TEXT_ERROR_CHARS};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use value::{Blob, Body, BodyValue, FilePart, MultipartForm, MultipartPart};

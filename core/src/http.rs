//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. The client builds an
//! `HttpRequest`, hands it to a `Transport` together with the call's
//! composite `CancelSignal`, and normalizes whatever comes back. The
//! transport owns the actual I/O, including multipart framing, since only
//! it knows the boundary it writes.
//!
//! All fields use owned types so requests can move onto worker threads.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::cancel::CancelSignal;
use crate::error::TransportError;
use crate::value::MultipartForm;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized request body, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured (JSON) text.
    Text(String),
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    /// Fields and files; the transport frames them and picks the boundary.
    Multipart(MultipartForm),
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Upper bound for the whole exchange. Transports that cannot drop an
    /// in-flight call apply it themselves so an abandoned call still ends.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Executes requests against the network.
///
/// Implementations must watch `signal` and return
/// `TransportError::Aborted` once it fires, so cancellation can be told
/// apart from network failure. A call the transport stops waiting for must
/// still be bounded by `HttpRequest::timeout`.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
        signal: CancelSignal,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

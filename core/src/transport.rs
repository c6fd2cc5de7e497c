//! Blocking `ureq` transport driven from async code.
//!
//! # Design
//! ureq is synchronous, so each call runs on tokio's blocking pool while
//! the async side races it against the composite cancellation signal. When
//! the signal wins the caller gets `TransportError::Aborted` right away.
//! A blocking call cannot be interrupted from outside, so every call also
//! carries the request's timeout as ureq's global timeout: an abandoned call
//! gives up its thread and socket once that deadline passes.
//!
//! Status codes are never treated as errors here. Interpreting them is the
//! normalizer's job.

use std::time::Duration;

use ureq::Agent;
use uuid::Uuid;

use crate::cancel::{AbortReason, CancelSignal};
use crate::error::TransportError;
use crate::headers::FORM_CONTENT_TYPE;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
use crate::value::{MultipartForm, MultipartPart};

const OCTET_STREAM: &str = "application/octet-stream";
const BLOB_FILE_NAME: &str = "blob";

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest, signal: CancelSignal) -> Result<HttpResponse, TransportError> {
        if let Some(reason) = signal.reason() {
            return Err(TransportError::Aborted(reason));
        }

        let agent = self.agent.clone();
        let call = tokio::task::spawn_blocking(move || send_blocking(&agent, request));

        tokio::select! {
            joined = call => joined.unwrap_or_else(|e| Err(TransportError::Network(e.to_string()))),
            reason = signal.cancelled() => Err(TransportError::Aborted(reason)),
        }
    }
}

fn send_blocking(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let HttpRequest {
        method,
        url,
        mut headers,
        body,
        timeout,
    } = request;

    let payload = match body {
        None => None,
        Some(RequestBody::Text(text)) => Some(text.into_bytes()),
        Some(RequestBody::Form(text)) => {
            if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
            }
            Some(text.into_bytes())
        }
        Some(RequestBody::Multipart(form)) => {
            let boundary = format!("----api-client-{}", Uuid::new_v4().simple());
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
            headers.push((
                "content-type".to_string(),
                format!("multipart/form-data; boundary={boundary}"),
            ));
            Some(encode_multipart(&form, &boundary))
        }
    };

    let result = match method {
        HttpMethod::Get => prepare(agent.get(&url), &headers, timeout).call(),
        HttpMethod::Delete => {
            let builder = prepare(agent.delete(&url), &headers, timeout);
            match payload {
                Some(bytes) => builder.force_send_body().send(&bytes[..]),
                None => builder.call(),
            }
        }
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
            let builder = match method {
                HttpMethod::Post => agent.post(&url),
                HttpMethod::Put => agent.put(&url),
                _ => agent.patch(&url),
            };
            let builder = prepare(builder, &headers, timeout);
            match payload {
                Some(bytes) => builder.send(&bytes[..]),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(|e| transport_error(e, timeout))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| transport_error(e, timeout))?;

    Ok(HttpResponse { status, headers, body })
}

fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match timeout {
        Some(timeout) => builder.config().timeout_global(Some(timeout)).build(),
        None => builder,
    }
}

/// ureq's own deadline is the call's timeout, so hitting it is an abort.
fn transport_error(err: ureq::Error, timeout: Option<Duration>) -> TransportError {
    match (err, timeout) {
        (ureq::Error::Timeout(_), Some(after)) => TransportError::Aborted(AbortReason::Timeout(after)),
        (err, _) => TransportError::Network(err.to_string()),
    }
}

/// Frame `form` as `multipart/form-data` with the given boundary.
pub fn encode_multipart(form: &MultipartForm, boundary: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for part in form.parts() {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match part {
            MultipartPart::Field { name, value } => {
                write_disposition(&mut out, name, None, None);
                out.extend_from_slice(value.as_bytes());
            }
            MultipartPart::File { name, file } => {
                write_disposition(
                    &mut out,
                    name,
                    Some(file.file_name.as_deref().unwrap_or(crate::body::DEFAULT_FILE_NAME)),
                    Some(file.content_type.as_deref().unwrap_or(OCTET_STREAM)),
                );
                out.extend_from_slice(&file.data);
            }
            MultipartPart::Blob { name, blob } => {
                write_disposition(
                    &mut out,
                    name,
                    Some(BLOB_FILE_NAME),
                    Some(blob.content_type.as_deref().unwrap_or(OCTET_STREAM)),
                );
                out.extend_from_slice(&blob.data);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

fn write_disposition(out: &mut Vec<u8>, name: &str, file_name: Option<&str>, content_type: Option<&str>) {
    let mut line = format!("Content-Disposition: form-data; name=\"{}\"", escape_quoted(name));
    if let Some(file_name) = file_name {
        line.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
    }
    line.push_str("\r\n");
    if let Some(content_type) = content_type {
        line.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    line.push_str("\r\n");
    out.extend_from_slice(line.as_bytes());
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

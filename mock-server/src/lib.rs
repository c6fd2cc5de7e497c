//! In-process stand-in for the backend API the client talks to.
//!
//! Covers the response shapes the client must normalize: JSON success with
//! and without `message`, validation errors with a `detail` array, string
//! `detail`, `message`-only errors, long plain-text errors, empty error
//! bodies, 204s and slow responses. The echo routes report back exactly
//! what arrived so tests can check query strings, headers and each body
//! encoding end to end.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, RawQuery},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const DEMO_EMAIL: &str = "user@example.com";
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub message: String,
}

/// One multipart part as seen by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub text: Option<String>,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default = "default_delay_ms")]
    pub ms: u64,
}

fn default_delay_ms() -> u64 {
    500
}

pub fn app() -> Router {
    Router::new()
        .route("/auth/login", post(login_json))
        .route("/auth/login/form", post(login_form))
        .route("/users/me", get(current_user))
        .route("/items", get(list_items).delete(delete_items))
        .route("/items/{id}", delete(delete_item))
        .route("/profile", axum::routing::put(echo_json).patch(echo_json))
        .route("/echo/json", post(echo_json))
        .route("/echo/form", post(echo_form))
        .route("/echo/multipart", post(echo_multipart))
        .route("/echo/headers", get(echo_headers))
        .route("/slow", get(slow))
        .route("/errors/message", get(error_message))
        .route("/errors/text", get(error_text))
        .route("/errors/empty", get(error_empty))
        .route("/errors/malformed", get(malformed_json))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authenticate(credentials: &Credentials) -> Response {
    let mut missing = Vec::new();
    if credentials.email.as_deref().unwrap_or_default().is_empty() {
        missing.push(json!({ "loc": ["body", "email"], "msg": "field required", "type": "missing" }));
    }
    if credentials.password.as_deref().unwrap_or_default().is_empty() {
        missing.push(json!({ "loc": ["body", "password"], "msg": "field required", "type": "missing" }));
    }
    if !missing.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": missing }))).into_response();
    }

    if credentials.email.as_deref() != Some(DEMO_EMAIL) || credentials.password.as_deref() != Some(DEMO_PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid email or password" })),
        )
            .into_response();
    }

    Json(LoginResponse {
        access_token: Uuid::new_v4().to_string(),
        token_type: "bearer".to_string(),
        message: "Login successful".to_string(),
    })
    .into_response()
}

async fn login_json(Json(credentials): Json<Credentials>) -> Response {
    authenticate(&credentials)
}

async fn login_form(Form(credentials): Form<Credentials>) -> Response {
    authenticate(&credentials)
}

async fn current_user(headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(_) => Json(json!({ "email": DEMO_EMAIL })).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Not authenticated" }))).into_response(),
    }
}

/// Echo the raw query and its decoded pairs, in arrival order.
async fn list_items(RawQuery(raw): RawQuery, Query(pairs): Query<Vec<(String, String)>>) -> Json<Value> {
    Json(json!({ "raw_query": raw, "pairs": pairs }))
}

async fn delete_item(Path(id): Path<u64>) -> StatusCode {
    tracing::debug!(id, "item deleted");
    StatusCode::NO_CONTENT
}

async fn delete_items(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "deleted": body.get("ids").cloned().unwrap_or(Value::Null) }))
}

async fn echo_json(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "received": body, "content_type": content_type(&headers) }))
}

async fn echo_form(headers: HeaderMap, Form(pairs): Form<Vec<(String, String)>>) -> Json<Value> {
    Json(json!({ "pairs": pairs, "content_type": content_type(&headers) }))
}

async fn echo_multipart(mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (StatusCode::BAD_REQUEST, err.body_text()).into_response(),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return (StatusCode::BAD_REQUEST, err.body_text()).into_response(),
        };
        let text = match file_name {
            Some(_) => None,
            None => String::from_utf8(bytes.to_vec()).ok(),
        };
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            text,
            size: bytes.len(),
        });
    }
    Json(json!({ "parts": parts })).into_response()
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    Json(
        headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect(),
    )
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({ "slept_ms": params.ms }))
}

async fn error_message() -> Response {
    (StatusCode::CONFLICT, Json(json!({ "message": "Email already registered" }))).into_response()
}

async fn error_text() -> Response {
    let body = format!("Internal failure: {}", "stack frame ".repeat(60));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

async fn error_empty() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn malformed_json() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], "{\"truncated\":").into_response()
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

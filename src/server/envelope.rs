//! Response envelopes and request ids.
//!
//! Every response body is `{ok, message, requestId, ts, ...}`. The request
//! id comes from the incoming `x-request-id` header or is generated, is
//! visible to everything running inside the request through a task-local,
//! and is echoed back in the response header.

use crate::error::{ApiError, ErrorKind};
use axum::Json;
use axum::extract::Request;
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied request id that is reused as is.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reuse a header value when it is printable and reasonably short.
    fn from_header(value: Option<&HeaderValue>) -> Option<Self> {
        let raw = value?.to_str().ok()?.trim();
        if raw.is_empty() || raw.len() > MAX_REQUEST_ID_LEN {
            return None;
        }
        Some(Self::new(raw))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// Id of the request being handled, or a fresh one outside any request.
pub fn current_request_id() -> RequestId {
    CURRENT_REQUEST_ID
        .try_with(RequestId::clone)
        .unwrap_or_else(|_| RequestId::generate())
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Middleware: pick the request id, run the request with it in scope,
/// echo it back and log the outcome.
pub async fn assign_request_id(request: Request, next: Next) -> Response {
    let request_id = RequestId::from_header(request.headers().get(&REQUEST_ID_HEADER))
        .unwrap_or_else(RequestId::generate);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = CURRENT_REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );

    response
}

/// A successful response: status, human-readable message, optional data.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    message: String,
    data: Option<Value>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message)
        }
    }

    /// Attach a serializable payload as `data`.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self, ApiError> {
        self.data = Some(serde_json::to_value(data).map_err(ApiError::internal)?);
        Ok(self)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody {
    ok: bool,
    message: String,
    request_id: String,
    ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            ok: true,
            message: self.message,
            request_id: current_request_id().to_string(),
            ts: timestamp(),
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    ok: bool,
    #[serde(rename = "type")]
    kind: ErrorKind,
    message: String,
    status: u16,
    request_id: String,
    ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Map<String, Value>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = current_request_id();
        let status = self.status();

        let message = match self.kind {
            ErrorKind::InternalError => {
                error!(request_id = %request_id, cause = %self.message, "Internal error");
                "Internal server error".to_string()
            }
            _ => {
                warn!(request_id = %request_id, kind = %self.kind, message = %self.message, "Request failed");
                self.message
            }
        };

        let mut details = self.details;
        if let Some(field) = self.field {
            details
                .get_or_insert_with(Map::new)
                .insert("field".to_string(), Value::String(field));
        }

        let body = ErrorBody {
            ok: false,
            kind: self.kind,
            message,
            status: status.as_u16(),
            request_id: request_id.to_string(),
            ts: timestamp(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`: answer with an `internal_error`
/// envelope instead of dropping the connection.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(panic = %detail, "Handler panicked");
    ApiError::internal(detail).into_response()
}

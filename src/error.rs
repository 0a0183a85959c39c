//! Structured error types for API responses.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Error kinds for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed JSON, missing required field, unparsable identifier.
    BadRequest,
    /// Semantically invalid field value (empty title, blank tag name).
    ValidationError,
    /// Referenced task, tag or route does not exist.
    NotFound,
    /// Storage failure or unexpected fault.
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InternalError => "internal_error",
        }
    }

    /// HTTP status used when this kind reaches the boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::BadRequest | ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error carried from validation or storage up to the envelope.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    // Convenience constructors

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::bad_request(format!("{} is required", field)).with_field(field)
    }

    pub fn invalid_id(field: &str, raw: &str) -> Self {
        Self::bad_request(format!("{} must be a UUID, got '{}'", field, raw)).with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, reason).with_field(field)
    }

    pub fn task_not_found(task_id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("Task not found: {}", task_id))
    }

    pub fn tag_not_found(tag_id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("Tag not found: {}", tag_id)).with_field("tags")
    }

    pub fn route_not_found(method: &str, path: &str) -> Self {
        Self::new(ErrorKind::NotFound, "Route not found")
            .with_detail("method", method)
            .with_detail("path", path)
            .with_detail("hint", "Check path, HTTP method and trailing slash")
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::InternalError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to ApiError first
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(format!("{:#}", err)),
        }
    }
}

/// Result type for service and handler operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_http_status() {
        assert_eq!(ErrorKind::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_value(ErrorKind::ValidationError).unwrap();
        assert_eq!(json, "validation_error");
    }

    #[test]
    fn anyhow_downcast_preserves_api_error() {
        let err: anyhow::Error = ApiError::tag_not_found("abc").into();
        let api: ApiError = err.into();
        assert_eq!(api.kind, ErrorKind::NotFound);
        assert_eq!(api.field.as_deref(), Some("tags"));
    }

    #[test]
    fn foreign_anyhow_error_becomes_internal() {
        let api: ApiError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(api.kind, ErrorKind::InternalError);
        assert!(api.message.contains("disk on fire"));
    }

    #[test]
    fn route_not_found_carries_method_and_path() {
        let err = ApiError::route_not_found("GET", "/nope");
        let details = err.details.unwrap();
        assert_eq!(details["method"], "GET");
        assert_eq!(details["path"], "/nope");
    }
}

//! # Error Handling
//!
//! Domain error taxonomy for the actions API plus the unified problem+json
//! response format (with trace ID propagation) used by the HTTP surface.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Field-level validation failures, accumulated by the workflow and input
/// checks. Mirrors the shape of a serializer-layer validation error so the
/// API surface can report per-field problems.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Ok when no error was recorded, Err(self) otherwise.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn details(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .errors
            .iter()
            .map(|e| (e.field.clone(), json!(e.message)))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors surfaced by the actions API.
///
/// `Conflict` is the retryable kind: the aggregate claim failed because a
/// concurrent mutation got there first. Everything else is either a caller
/// mistake or an infrastructure failure.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("signal {signal_id} is locked by a concurrent mutation")]
    Conflict { signal_id: i64 },
    #[error("signal {0} not found")]
    SignalNotFound(i64),
    #[error("category {0} not found")]
    CategoryNotFound(i64),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl ActionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Validation(ValidationErrors::single(field, message))
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ActionError> for ApiError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::Validation(errors) => Self::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "Validation failed",
            )
            .with_details(errors.details()),
            ActionError::Conflict { signal_id } => Self::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                &format!("Signal {} is being mutated by another request", signal_id),
            )
            .with_retry_after(1),
            ActionError::SignalNotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Signal {} not found", id),
            ),
            ActionError::CategoryNotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Category {} not found", id),
            ),
            ActionError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes. Internal details (paths, io errors,
//! panics) are logged here and never sent to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use netsynth_runner::RunnerError;

use crate::concurrency::AdmissionError;
use crate::schema::synthesize::LogExcerpt;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "SYNTHESIS_FAILED", "SERVER_BUSY").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details (tool logs, exit code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Request validation failures. All map to 400 and are raised before any
/// workspace exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("unsupported content type '{0}': expected application/json or text/plain")]
    UnsupportedContentType(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("design source is empty")]
    EmptySource,

    #[error("design source exceeds {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyBody => "EMPTY_BODY",
            ValidationError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ValidationError::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
            ValidationError::Malformed(_) => "MALFORMED_REQUEST",
            ValidationError::EmptySource => "EMPTY_SOURCE",
            ValidationError::SourceTooLarge { .. } => "SOURCE_TOO_LARGE",
            ValidationError::InvalidOption(_) => "INVALID_OPTION",
        }
    }
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request (400).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The tool rejected the design (422).
    #[error("synthesis failed: {exit}")]
    SynthesisFailed {
        exit: String,
        exit_code: Option<i32>,
        logs: LogExcerpt,
    },

    /// The tool exited cleanly but its netlist is missing or unreadable (502).
    #[error("synthesis produced no usable netlist: {reason}")]
    BadToolOutput { reason: String, logs: LogExcerpt },

    /// The tool exceeded its time limit (504).
    #[error("synthesis timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64, logs: LogExcerpt },

    /// Admission refused (503).
    #[error(transparent)]
    Busy(#[from] AdmissionError),

    /// Internal server error (500). The message is logged, not returned.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SynthesisFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadToolOutput { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ApiErrorDetail {
        let (code, message, details) = match self {
            ApiError::Validation(err) => (err.code(), err.to_string(), None),
            ApiError::SynthesisFailed {
                exit_code, logs, ..
            } => (
                "SYNTHESIS_FAILED",
                self.to_string(),
                Some(serde_json::json!({ "exit_code": exit_code, "log": logs })),
            ),
            ApiError::BadToolOutput { logs, .. } => (
                "NO_NETLIST",
                "synthesis produced no usable netlist".to_string(),
                Some(serde_json::json!({ "log": logs })),
            ),
            ApiError::Timeout { timeout_secs, logs } => (
                "SYNTHESIS_TIMEOUT",
                self.to_string(),
                Some(serde_json::json!({ "timeout_secs": timeout_secs, "log": logs })),
            ),
            ApiError::Busy(err) => ("SERVER_BUSY", err.to_string(), None),
            ApiError::InternalError(_) => (
                "INTERNAL_ERROR",
                "internal server error".to_string(),
                None,
            ),
        };
        ApiErrorDetail {
            code: code.to_string(),
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InternalError(msg) => tracing::error!(error = %msg, "request failed"),
            ApiError::BadToolOutput { reason, .. } => {
                tracing::warn!(%reason, "synthesis output rejected")
            }
            _ => {}
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.detail(),
        });

        let mut response = (self.status(), axum::Json(body)).into_response();
        if matches!(self, ApiError::Busy(_)) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, axum::http::HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::InvalidOption(msg) => ValidationError::InvalidOption(msg).into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

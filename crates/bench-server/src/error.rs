//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bench_core::BenchError;
use bench_engine::GenerationError;
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by the HTTP handlers.
///
/// Rendered as `{"error": {"message": .., "type": ..}}` with the matching
/// status code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Machine-readable error type.
    pub error_type: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Offending fields or validation diagnostics.
    pub details: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    error_type: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    details: &'a [String],
}

impl ApiError {
    /// Create an error with the given status and type.
    pub fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Attach details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// 400 for malformed requests.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request_error", message)
    }

    /// 400 for requests that fail validation.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// 502 for failures of the target endpoint.
    pub fn bad_gateway(error_type: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, error_type, message)
    }

    /// 500 for unexpected failures.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error_type = self.error_type, message = %self.message, "Request failed");
        } else {
            warn!(status = %self.status, error_type = self.error_type, message = %self.message, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                message: &self.message,
                error_type: self.error_type,
                details: &self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BenchError> for ApiError {
    fn from(err: BenchError) -> Self {
        match err {
            BenchError::Validation { message, fields } => Self::validation(message).with_details(fields),
            BenchError::Transport { message, .. } => Self::bad_gateway("transport_error", message),
            BenchError::Cancelled => Self::new(StatusCode::SERVICE_UNAVAILABLE, "cancelled", "cancelled"),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::SchemaValidationFailed { diagnostics } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "schema_validation_failed",
                "Generated output did not match the prompt schema",
            )
            .with_details(diagnostics),
            GenerationError::PromptGenerationFailed { message } => {
                Self::bad_gateway("prompt_generation_failed", message)
            }
            GenerationError::Upstream(e) => match BenchError::from(e) {
                BenchError::Validation { message, fields } => {
                    Self::validation(message).with_details(fields)
                }
                other => Self::bad_gateway("upstream_error", other.to_string()),
            },
        }
    }
}

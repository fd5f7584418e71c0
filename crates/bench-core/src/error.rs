//! Error types shared across the harness.

use thiserror::Error;

/// Result alias for core operations.
pub type BenchResult<T> = Result<T, BenchError>;

/// Errors raised while accepting or executing a benchmark job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BenchError {
    /// The submitted job is malformed and was rejected before any network activity.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description.
        message: String,
        /// Offending request fields, in camelCase wire form.
        fields: Vec<String>,
    },

    /// Connecting to the target endpoint failed or it answered with a non-2xx status.
    #[error("Transport error: {message}")]
    Transport {
        /// Failure description.
        message: String,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
    },

    /// The request was cancelled before it reached a terminal state.
    #[error("cancelled")]
    Cancelled,
}

impl BenchError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Create a validation error naming the offending fields.
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::Validation {
            message: format!("Missing required fields: {}", fields.join(", ")),
            fields,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Check whether this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => Some(400),
            Self::Transport { status, .. } => *status,
            Self::Cancelled => None,
        }
    }
}

//! Error types for the chat-completions client.

use bench_core::BenchError;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the target endpoint.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error during client setup.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-2xx response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the server.
        message: String,
        /// Error type/code from the server.
        error_type: Option<String>,
    },

    /// Response parsing failed.
    #[error("Failed to parse response: {message}")]
    ParseError {
        /// Error message describing the parse failure.
        message: String,
    },

    /// Streaming error.
    #[error("Streaming error: {message}")]
    Streaming {
        /// Error message describing the streaming error.
        message: String,
    },

    /// Timeout waiting for response.
    #[error("Request timed out after {duration_ms}ms")]
    Timeout {
        /// Duration in milliseconds before timeout.
        duration_ms: u64,
    },

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message describing the connection error.
        message: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an API error from response details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            error_type: None,
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a streaming error.
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Get the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<Error> for BenchError {
    fn from(error: Error) -> Self {
        match error {
            Error::Configuration { message } => Self::validation(message),
            other => Self::transport(other.to_string(), other.status_code()),
        }
    }
}

/// Error response body in the OpenAI format.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Detailed error information from the API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Error code.
    pub code: Option<serde_json::Value>,
}

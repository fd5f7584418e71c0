//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML or TOML.
    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The file extension does not name a supported format.
    #[error("Unsupported config format: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    /// An environment override holds a value of the wrong shape.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// The merged configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid environment override error.
    pub fn invalid_env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

//! Client configuration.

use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use url::Url;

/// Configuration for a chat-completions client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the target API.
    pub(crate) base_url: Url,
    /// Bearer credential.
    pub(crate) api_key: Option<Secret<String>>,
    /// Whole-request timeout, body included.
    pub(crate) timeout: Duration,
    /// Connection timeout.
    pub(crate) connect_timeout: Duration,
    /// User agent string.
    pub(crate) user_agent: String,
}

impl ClientConfig {
    /// Default request timeout (120 seconds). Bounds a whole streamed response.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    /// Default connection timeout (10 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default user agent.
    pub const DEFAULT_USER_AGENT: &'static str = concat!("llm-stream-bench/", env!("CARGO_PKG_VERSION"));

    /// Create a new configuration with default values.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout: Self::DEFAULT_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn api_key_value(&self) -> Option<&str> {
        self.api_key.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// URL of an API path, appended to the base URL.
    ///
    /// Appending keeps any path prefix on the base (`https://host/openai`).
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

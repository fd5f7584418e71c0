//! HTTP client for OpenAI-compatible chat-completions endpoints.

use crate::config::ClientConfig;
use crate::error::{ApiErrorResponse, Error, Result};
use crate::request::ChatRequest;
use crate::response::ChatResponse;
use crate::streaming::EventStream;
use bench_core::{Endpoint, CHAT_COMPLETIONS_PATH};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use secrecy::Secret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Client bound to one target endpoint.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use bench_client::{ChatRequest, Client, Message};
///
/// #[tokio::main]
/// async fn main() -> Result<(), bench_client::Error> {
///     let client = Client::builder()
///         .base_url("http://localhost:8000")
///         .api_key("sk-local")
///         .build()?;
///
///     let request = ChatRequest::new("llama-3", vec![Message::user("Hello!")]);
///     let response = client.chat_completion(&request).await?;
///     println!("{}", response.content());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client for a job endpoint with the given timeouts.
    pub fn for_endpoint(endpoint: &Endpoint, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        Self::builder()
            .base_url(endpoint.base_url().as_str())
            .api_key(endpoint.api_key())
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| Error::configuration(format!("Invalid user agent: {e}")))?,
        );

        if let Some(api_key) = config.api_key_value() {
            let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| Error::configuration(format!("Invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a buffered chat completion request.
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.config.endpoint_url(CHAT_COMPLETIONS_PATH);

        let mut request = request.clone();
        request.stream = false;

        debug!("Sending chat completion request to {}", url);

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Send a streaming chat completion request.
    ///
    /// Resolves once the response headers arrive; a non-2xx status is an
    /// error. The body is then consumed lazily through the returned stream.
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn chat_completion_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let url = self.config.endpoint_url(CHAT_COMPLETIONS_PATH);

        let mut request = request.clone();
        request.stream = true;

        debug!("Sending streaming chat completion request to {}", url);

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        Ok(EventStream::new(response.bytes_stream()))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::parse_error(e.to_string()))
        } else {
            Err(self.handle_error_response(response).await)
        }
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Error::Api {
                status,
                message: api_error.error.message,
                error_type: api_error
                    .error
                    .error_type
                    .or_else(|| api_error.error.code.map(|c| c.to_string())),
            };
        }

        let body = body.trim();
        Error::api(
            status,
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            },
        )
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::timeout(u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if error.is_connect() {
            Error::connection(error.to_string())
        } else {
            Error::Http(error)
        }
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<Secret<String>>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] when the base URL is missing or does
    /// not parse, or a header value is invalid.
    pub fn build(self) -> Result<Client> {
        let raw = self
            .base_url
            .ok_or_else(|| Error::configuration("base URL is required"))?;
        let base_url = Url::parse(&raw)
            .map_err(|e| Error::configuration(format!("Invalid base URL '{raw}': {e}")))?;

        let config = ClientConfig {
            base_url,
            api_key: self.api_key,
            timeout: self.timeout.unwrap_or(ClientConfig::DEFAULT_TIMEOUT),
            connect_timeout: self
                .connect_timeout
                .unwrap_or(ClientConfig::DEFAULT_CONNECT_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| ClientConfig::DEFAULT_USER_AGENT.to_string()),
        };

        Client::new(config)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("has_api_key", &self.config.has_api_key())
            .finish()
    }
}

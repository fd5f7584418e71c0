//! Execution of a single work item against the target endpoint.

use crate::sink::ResultSink;
use bench_client::{ChatRequest, Client, ClientConfig, Message, StreamEvent};
use bench_core::{
    BatchEvent, BenchError, BenchResult, ErrorOutcome, Job, Outcome, StreamMetrics, StreamState,
    SuccessOutcome, WorkItem,
};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Transport settings applied to every request of a batch.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Whole-request timeout, body included.
    pub request_timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent sent upstream.
    pub user_agent: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            request_timeout: ClientConfig::DEFAULT_TIMEOUT,
            connect_timeout: ClientConfig::DEFAULT_CONNECT_TIMEOUT,
            user_agent: ClientConfig::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Executes one prompt and turns whatever happens into an [`Outcome`].
///
/// Failures never propagate past [`RequestRunner::run`]; they become error
/// outcomes.
#[derive(Debug, Clone)]
pub struct RequestRunner {
    client: Client,
    model: String,
    max_tokens: u32,
    stream: bool,
}

impl RequestRunner {
    /// Create a runner for the requests of `job`.
    ///
    /// # Errors
    /// Returns [`BenchError::Validation`] when the endpoint cannot be turned
    /// into an HTTP client (for instance an API key that is not a valid
    /// header value).
    pub fn for_job(job: &Job, settings: &RunnerSettings) -> BenchResult<Self> {
        let client = Client::builder()
            .base_url(job.endpoint().base_url().as_str())
            .api_key(job.endpoint().api_key())
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self::new(client, job.model(), job.max_tokens(), job.is_streaming()))
    }

    /// Create a runner over an existing client.
    pub fn new(client: Client, model: impl Into<String>, max_tokens: u32, stream: bool) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            stream,
        }
    }

    /// Whether responses are consumed as SSE streams.
    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Run one work item: emit `started`, issue the request, and return the
    /// terminal outcome.
    ///
    /// When `cancel` fires before the request finishes the outcome is a
    /// cancelled error.
    #[instrument(skip_all, fields(index = item.index, model = %self.model, stream = self.stream))]
    pub async fn run(
        &self,
        item: WorkItem,
        sink: &dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Outcome {
        sink.emit(BatchEvent::started(&item)).await;

        let started_at = Instant::now();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(BenchError::Cancelled),
            result = self.execute(&item.prompt, started_at) => result,
        };

        match result {
            Ok((text, metrics)) => {
                debug!(
                    tokens = metrics.total_tokens,
                    tokens_per_second = metrics.tokens_per_second,
                    "Request completed"
                );
                Outcome::Success(SuccessOutcome::from_metrics(item, text, &metrics))
            }
            Err(BenchError::Cancelled) => {
                debug!("Request cancelled");
                Outcome::Error(ErrorOutcome::cancelled(item, started_at.elapsed()))
            }
            Err(e) => {
                warn!(error = %e, "Request failed");
                Outcome::Error(ErrorOutcome::new(item, describe(&e), started_at.elapsed()))
            }
        }
    }

    async fn execute(&self, prompt: &str, started_at: Instant) -> BenchResult<(String, StreamMetrics)> {
        let request = ChatRequest::new(self.model.clone(), vec![Message::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_stream(self.stream);

        let mut state = StreamState::new(started_at);

        if self.stream {
            let mut events = self.client.chat_completion_stream(&request).await?;
            while let Some(event) = events.next().await {
                match event {
                    StreamEvent::ContentDelta(text) => state.record_delta(&text, Instant::now()),
                    StreamEvent::Done => break,
                    StreamEvent::StreamError(cause) => {
                        return Err(BenchError::transport(cause, None));
                    }
                }
            }
        } else {
            let response = self.client.chat_completion(&request).await?;
            state.record_buffered(response.content(), response.completion_tokens());
        }

        let metrics = state.finish(Instant::now());
        Ok((state.into_text(), metrics))
    }
}

/// Failure description carried by an error outcome.
fn describe(error: &BenchError) -> String {
    match error {
        BenchError::Transport { message, .. } | BenchError::Validation { message, .. } => {
            message.clone()
        }
        BenchError::Cancelled => "cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"index": 0, "delta": {"content": fragment}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    fn runner(server: &MockServer, stream: bool) -> RequestRunner {
        let client = Client::builder()
            .base_url(server.uri())
            .api_key("sk-test")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        RequestRunner::new(client, "test-model", 100, stream)
    }

    #[tokio::test]
    async fn test_streaming_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true, "max_tokens": 100})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[" Hel", "lo", " world "])),
            )
            .mount(&server)
            .await;

        let sink = CollectingSink::new();
        let outcome = runner(&server, true)
            .run(WorkItem::new(1, "Say hello"), &sink, &CancellationToken::new())
            .await;

        let Outcome::Success(success) = outcome else {
            panic!("expected a success outcome");
        };
        assert_eq!(success.index, 1);
        assert_eq!(success.generated_text, "Hello world");
        assert_eq!(success.total_tokens, 3);
        assert!(success.tokens_per_second >= 0.0);
        assert!(success.time_to_first_token_ms.is_some());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], BatchEvent::Started(s) if s.index == 1 && s.prompt == "Say hello"));
    }

    #[tokio::test]
    async fn test_buffered_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "whole answer\n"}}],
                "usage": {"prompt_tokens": 4, "completion_tokens": 7, "total_tokens": 11}
            })))
            .mount(&server)
            .await;

        let outcome = runner(&server, false)
            .run(WorkItem::new(2, "p"), &CollectingSink::new(), &CancellationToken::new())
            .await;

        let Outcome::Success(success) = outcome else {
            panic!("expected a success outcome");
        };
        assert_eq!(success.generated_text, "whole answer");
        assert_eq!(success.total_tokens, 7);
        assert_eq!(success.time_to_first_token_ms, None);
    }

    #[tokio::test]
    async fn test_http_error_becomes_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let outcome = runner(&server, true)
            .run(WorkItem::new(3, "p"), &CollectingSink::new(), &CancellationToken::new())
            .await;

        let Outcome::Error(error) = outcome else {
            panic!("expected an error outcome");
        };
        assert_eq!(error.index, 3);
        assert_eq!(error.error, "API error (500): upstream exploded");
        assert!(!error.cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(10))
                    .set_body_string(sse_body(&["late"])),
            )
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = runner(&server, true)
            .run(WorkItem::new(4, "p"), &CollectingSink::new(), &cancel)
            .await;

        let Outcome::Error(error) = outcome else {
            panic!("expected an error outcome");
        };
        assert!(error.cancelled);
        assert_eq!(error.error, "cancelled");
    }

    #[test]
    fn test_describe_strips_prefix() {
        let err = BenchError::transport("connection reset", None);
        assert_eq!(describe(&err), "connection reset");
        assert_eq!(describe(&BenchError::Cancelled), "cancelled");
    }
}

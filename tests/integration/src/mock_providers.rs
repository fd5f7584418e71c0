//! Mock chat-completions endpoints for integration testing
//!
//! Wiremock servers speaking the OpenAI chat-completions protocol, streaming
//! and non-streaming.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path every mock answers on.
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Mock OpenAI-compatible API server
pub struct MockOpenAI {
    pub server: MockServer,
}

impl MockOpenAI {
    /// Create a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Number of chat-completions requests received so far
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Bodies of the chat-completions requests received so far
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Streaming response made of `chunks`, terminated by `[DONE]`
    pub async fn mock_streaming_response(&self, chunks: &[&str]) {
        self.mock_streaming_response_delayed(chunks, Duration::ZERO).await;
    }

    /// Streaming response delivered after `delay`
    pub async fn mock_streaming_response_delayed(&self, chunks: &[&str], delay: Duration) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse_body(chunks))
                    .append_header("Content-Type", "text/event-stream")
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Streaming response that closes without `[DONE]`
    pub async fn mock_truncated_stream(&self, chunks: &[&str]) {
        let mut body = String::new();
        for chunk in chunks {
            body.push_str(&format!("data: {}\n\n", streaming_chunk(chunk)));
        }
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }

    /// Non-streaming response
    pub async fn mock_chat_completion(&self, content: &str, completion_tokens: u64) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response(content, completion_tokens)),
            )
            .mount(&self.server)
            .await;
    }

    /// Server error for requests whose body contains `needle`
    pub async fn mock_error_for(&self, needle: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(body_string_contains(needle))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(error_response("server_error", "Internal server error")),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Structured-output response whose message content is `content`
    pub async fn mock_structured_content(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(body_partial_json(json!({"response_format": {"type": "json_schema"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content, 0)))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Response for requests without a `response_format`
    pub async fn mock_unstructured_content(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content, 0)))
            .with_priority(5)
            .mount(&self.server)
            .await;
    }
}

/// SSE body of `chunks` followed by `[DONE]`
pub fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"role": "assistant"}}]})
    ));
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", streaming_chunk(chunk)));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn streaming_chunk(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "model": "test-model",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
}

fn chat_response(content: &str, completion_tokens: u64) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 5,
            "completion_tokens": completion_tokens,
            "total_tokens": 5 + completion_tokens
        }
    })
}

fn error_response(error_type: &str, message: &str) -> Value {
    json!({"error": {"type": error_type, "message": message}})
}

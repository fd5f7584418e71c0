//! End-to-end tests: HTTP front-end to mock upstream and back

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use bench_core::BatchEvent;
use futures::StreamExt;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

fn summary_of(events: &[BatchEvent]) -> &bench_core::BatchSummary {
    match events.last() {
        Some(BatchEvent::Summary(summary)) => summary,
        other => panic!("expected summary as last record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streamed_batch_over_http() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["Hello", " world"]).await;

    let server = TestServer::with_default_config().await;
    let body = job_with_prompts(&mock.url(), &["one", "two", "three", "four"], json!(2));
    let events = server.post_ndjson("/api/benchmark", &body).await;

    // 4 started + 4 terminal + summary
    assert_eq!(events.len(), 9);

    let summary = summary_of(&events);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total_tokens, 8);

    for event in &events {
        if let BatchEvent::Success(outcome) = event {
            assert_eq!(outcome.generated_text, "Hello world");
            assert_eq!(outcome.total_tokens, 2);
            assert!(outcome.time_to_first_token_ms.is_some());
        }
    }

    let indices: HashSet<_> = events
        .iter()
        .filter(|e| e.is_terminal())
        .filter_map(BatchEvent::index)
        .collect();
    assert_eq!(indices, (1..=4).collect::<HashSet<_>>());
    assert_eq!(mock.calls().await, 4);
}

#[tokio::test]
async fn test_started_precedes_terminal_for_each_item() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["ok"]).await;

    let server = TestServer::with_default_config().await;
    let body = job_with_repeated_prompt(&mock.url(), "ping", 5);
    let events = server.post_ndjson("/api/test-concurrency", &body).await;

    let mut started = HashSet::new();
    for event in &events {
        match event {
            BatchEvent::Started(e) => {
                assert!(started.insert(e.index), "item {} started twice", e.index);
                assert_eq!(e.prompt, "ping");
            }
            BatchEvent::Success(_) | BatchEvent::Error(_) => {
                let index = event.index().unwrap();
                assert!(started.contains(&index), "item {index} finished before starting");
            }
            BatchEvent::Summary(_) => {}
        }
    }
    assert_eq!(started.len(), 5);
    assert_eq!(summary_of(&events).succeeded, 5);
}

#[tokio::test]
async fn test_upstream_failures_become_error_records() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["fine"]).await;
    mock.mock_error_for("broken", 500).await;

    let server = TestServer::with_default_config().await;
    let body = job_with_prompts(&mock.url(), &["good", "broken", "also good"], json!(null));
    let events = server.post_ndjson("/api/benchmark", &body).await;

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Error(outcome) => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index, 2);
    assert_eq!(errors[0].prompt, "broken");
    assert!(!errors[0].cancelled);

    let summary = summary_of(&events);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cancelled, 0);
}

#[tokio::test]
async fn test_non_streaming_batch_uses_reported_usage() {
    let mock = MockOpenAI::new().await;
    mock.mock_chat_completion("A buffered answer", 12).await;

    let server = TestServer::with_default_config().await;
    let mut body = job_with_prompts(&mock.url(), &["q"], json!(1));
    body["stream"] = json!(false);
    let events = server.post_ndjson("/api/benchmark", &body).await;

    let success = events
        .iter()
        .find_map(|e| match e {
            BatchEvent::Success(outcome) => Some(outcome),
            _ => None,
        })
        .expect("success record");
    assert_eq!(success.generated_text, "A buffered answer");
    assert_eq!(success.total_tokens, 12);
    assert!(success.time_to_first_token_ms.is_none());
}

#[tokio::test]
async fn test_stream_closed_without_done_still_succeeds() {
    let mock = MockOpenAI::new().await;
    mock.mock_truncated_stream(&["partial", " text"]).await;

    let server = TestServer::with_default_config().await;
    let body = job_with_prompts(&mock.url(), &["q"], json!(1));
    let events = server.post_ndjson("/api/benchmark", &body).await;

    let summary = summary_of(&events);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.total_tokens, 2);
}

#[tokio::test]
async fn test_client_disconnect_cancels_batch() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response_delayed(&["slow"], Duration::from_secs(10))
        .await;

    let server = TestServer::with_default_config().await;
    let body = job_with_prompts(&mock.url(), &["a", "b", "c"], json!(3));

    let response = server.post_json("/api/benchmark", &body).await;
    assert_eq!(response.status(), 200);

    let mut stream = response.bytes_stream();
    let first = stream.next().await.expect("first chunk").expect("body");
    assert!(String::from_utf8_lossy(&first).contains("\"kind\":\"started\""));

    let metrics = server.state.metrics.clone();
    assert!(
        wait_for(|| metrics.in_flight() == 3, Duration::from_secs(5)).await,
        "all items should be in flight"
    );

    drop(stream);

    assert!(
        wait_for(
            || metrics.in_flight() == 0 && metrics.requests("cancelled") == 3,
            Duration::from_secs(5)
        )
        .await,
        "dropping the response should cancel in-flight requests"
    );
    assert_eq!(metrics.requests("success"), 0);
}

#[tokio::test]
async fn test_metrics_reflect_finished_batches() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["x"]).await;

    let server = TestServer::with_default_config().await;
    let body = job_with_repeated_prompt(&mock.url(), "count me", 3);
    server.post_ndjson("/api/benchmark", &body).await;

    let text = server.get("/metrics").await.text().await.unwrap();
    assert!(text.contains("bench_requests_total{status=\"success\"} 3"));
    assert!(text.contains("bench_batches_total 1"));
    assert!(text.contains("bench_requests_in_flight 0"));
}

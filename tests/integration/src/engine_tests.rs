//! Engine tests driving `run_batch` directly against a mock upstream

use crate::fixtures::*;
use crate::mock_providers::*;
use bench_core::{BatchEvent, ConcurrencyBudget, Job};
use bench_engine::{run_batch, CollectingSink, RunnerSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn job(base_url: &str, count: usize, budget: ConcurrencyBudget) -> Job {
    Job::builder()
        .prompts((1..=count).map(|i| format!("prompt {i}")))
        .base_url(base_url)
        .api_key(TEST_API_KEY)
        .model(TEST_MODEL)
        .concurrency(budget)
        .build()
        .expect("valid job")
}

/// Highest number of items started but not yet finished at any point.
fn max_outstanding(events: &[BatchEvent]) -> usize {
    let mut outstanding = 0usize;
    let mut max = 0usize;
    for event in events {
        match event {
            BatchEvent::Started(_) => {
                outstanding += 1;
                max = max.max(outstanding);
            }
            BatchEvent::Success(_) | BatchEvent::Error(_) => outstanding -= 1,
            BatchEvent::Summary(_) => {}
        }
    }
    max
}

#[tokio::test]
async fn test_concurrency_budget_bounds_outstanding_items() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response_delayed(&["tick"], Duration::from_millis(30))
        .await;

    let sink = Arc::new(CollectingSink::new());
    let summary = run_batch(
        &job(&mock.url(), 9, ConcurrencyBudget::Limit(3)),
        &RunnerSettings::default(),
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let events = sink.events();
    assert_eq!(summary.succeeded, 9);
    assert_eq!(max_outstanding(&events), 3);
    assert!(matches!(events.last(), Some(BatchEvent::Summary(_))));
}

#[tokio::test]
async fn test_unbounded_budget_admits_everything_at_once() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response_delayed(&["tick"], Duration::from_millis(100))
        .await;

    let sink = Arc::new(CollectingSink::new());
    run_batch(
        &job(&mock.url(), 6, ConcurrencyBudget::Unbounded),
        &RunnerSettings::default(),
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let events = sink.events();
    assert!(events[..6].iter().all(|e| matches!(e, BatchEvent::Started(_))));
    assert_eq!(max_outstanding(&events), 6);
}

#[tokio::test]
async fn test_cancellation_stops_admission() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response_delayed(&["slow"], Duration::from_secs(10))
        .await;

    let sink = Arc::new(CollectingSink::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        run_batch(
            &job(&mock.url(), 5, ConcurrencyBudget::Limit(2)),
            &RunnerSettings::default(),
            sink.clone(),
            cancel,
        ),
    )
    .await
    .expect("cancelled batch should finish promptly")
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.cancelled, 2);
    assert_eq!(summary.succeeded, 0);

    let started = sink
        .events()
        .iter()
        .filter(|e| matches!(e, BatchEvent::Started(_)))
        .count();
    assert_eq!(started, 2);
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_errors_not_failure() {
    let sink = Arc::new(CollectingSink::new());
    let settings = RunnerSettings {
        connect_timeout: Duration::from_millis(500),
        ..RunnerSettings::default()
    };

    let summary = run_batch(
        &job("http://127.0.0.1:1", 2, ConcurrencyBudget::Limit(1)),
        &settings,
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.cancelled, 0);
}

#[tokio::test]
async fn test_metrics_sink_tracks_batch() {
    use bench_telemetry::{BenchMetrics, MetricsSink};

    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["a", "b", "c"]).await;
    mock.mock_error_for("prompt 2", 500).await;

    let metrics = Arc::new(BenchMetrics::new().unwrap());
    let collected = Arc::new(CollectingSink::new());
    let sink = Arc::new(MetricsSink::new(collected.clone(), Arc::clone(&metrics)));

    run_batch(
        &job(&mock.url(), 3, ConcurrencyBudget::Limit(2)),
        &RunnerSettings::default(),
        sink,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(metrics.requests("success"), 2);
    assert_eq!(metrics.requests("error"), 1);
    assert_eq!(metrics.in_flight(), 0);
    assert_eq!(collected.len(), 7);
    assert!(metrics.gather().contains("bench_batches_total 1"));
}

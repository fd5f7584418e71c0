//! HTTP request handlers.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bench_client::Client;
use bench_core::{BatchEvent, BenchError, Endpoint, JobRequest};
use bench_engine::{
    ChannelSink, ConcurrencyScheduler, GenerationMode, PromptSchemaGenerator, RequestRunner,
    ResultSink,
};
use bench_telemetry::MetricsSink;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::{error::ApiError, extractors::JsonBody, state::AppState};

/// Content type of the benchmark event stream.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Prompt count used when a generation request names none.
pub const DEFAULT_PROMPT_COUNT: usize = 10;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: Some(state.uptime_seconds()),
    })
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather(),
    )
}

/// Run a benchmark batch and stream its events as NDJSON.
///
/// The job is validated before the response starts; a malformed job is
/// answered with 400 and no upstream request is made. Dropping the response
/// body (the caller went away) cancels the batch.
#[instrument(skip_all)]
pub async fn run_benchmark(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<JobRequest>,
) -> Result<Response, ApiError> {
    let job = request.into_job(&state.config.job.limits())?;
    let runner = RequestRunner::for_job(&job, &state.config.client.runner_settings())?;
    let scheduler = ConcurrencyScheduler::new(runner, job.effective_concurrency());

    info!(
        batch_id = %scheduler.batch_id(),
        model = %job.model(),
        prompts = job.len(),
        budget = scheduler.budget(),
        stream = job.is_streaming(),
        "Benchmark accepted"
    );

    let (channel, events) = ChannelSink::new(state.config.server.event_buffer);
    let sink: Arc<dyn ResultSink> = Arc::new(MetricsSink::new(
        Arc::new(channel),
        Arc::clone(&state.metrics),
    ));

    let cancel = CancellationToken::new();
    let disconnect_guard = cancel.clone().drop_guard();
    let items = job.work_items();
    tokio::spawn(async move {
        scheduler.run(items, sink, cancel).await;
    });

    let body = futures::stream::unfold((events, disconnect_guard), |(mut events, guard)| async move {
        match events.recv().await {
            Some(event) => Some((Ok::<_, Infallible>(encode_event(&event)), (events, guard))),
            None => {
                guard.disarm();
                debug!("Event stream complete");
                None
            }
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

fn encode_event(event: &BatchEvent) -> Bytes {
    match event.to_ndjson() {
        Ok(line) => Bytes::from(line),
        Err(e) => {
            error!(error = %e, index = ?event.index(), "Failed to encode event");
            Bytes::new()
        }
    }
}

/// Prompt generation request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePromptsRequest {
    /// Base URL of the generating API
    #[serde(default)]
    pub api_url: Option<String>,
    /// Bearer credential
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier; falls back to the configured generator model
    #[serde(default)]
    pub model: Option<String>,
    /// What the prompts should exercise
    #[serde(default)]
    pub instructions: Option<String>,
    /// Number of prompts wanted
    #[serde(default)]
    pub count: Option<usize>,
    /// Strict or lenient output handling
    #[serde(default)]
    pub mode: Option<GenerationMode>,
}

/// Prompt generation response
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratePromptsResponse {
    /// Generated prompts
    pub prompts: Vec<String>,
}

/// Generate a prompt list through a structured-output request.
#[instrument(skip_all, fields(mode = tracing::field::Empty))]
pub async fn generate_prompts(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GeneratePromptsRequest>,
) -> Result<Json<GeneratePromptsResponse>, ApiError> {
    let generator_config = &state.config.generator;
    let mut missing = Vec::new();

    let api_url = required(request.api_url, "apiUrl", &mut missing);
    let api_key = required(request.api_key, "apiKey", &mut missing);
    let model = required(
        request.model.or_else(|| generator_config.model.clone()),
        "model",
        &mut missing,
    );
    let instructions = required(request.instructions, "instructions", &mut missing);
    if !missing.is_empty() {
        return Err(BenchError::missing_fields(missing).into());
    }

    let count = request.count.unwrap_or(DEFAULT_PROMPT_COUNT);
    if count == 0 {
        return Err(ApiError::validation("count must be at least 1").with_details(vec!["count".to_string()]));
    }
    let count = count.min(generator_config.max_prompts);
    let mode = request.mode.unwrap_or(generator_config.default_mode);
    tracing::Span::current().record("mode", tracing::field::display(mode));

    let endpoint = Endpoint::new(&api_url, api_key)?;
    let client = Client::for_endpoint(
        &endpoint,
        state.config.client.request_timeout,
        state.config.client.connect_timeout,
    )
    .map_err(BenchError::from)?;

    let prompts = PromptSchemaGenerator::new(client, model)
        .generate(&instructions, count, mode)
        .await?;

    Ok(Json(GeneratePromptsResponse { prompts }))
}

/// Take a required string field, recording its wire name when absent or blank.
fn required(value: Option<String>, name: &str, missing: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

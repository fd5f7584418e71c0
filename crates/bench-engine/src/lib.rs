//! Benchmark engine for LLM Stream Bench.
//!
//! Dispatches the prompts of a [`Job`] against its endpoint with bounded
//! parallelism and reports every event to a [`ResultSink`] as it happens.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bench_engine::{run_batch, ChannelSink, RunnerSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! let (sink, mut events) = ChannelSink::new(ChannelSink::DEFAULT_CAPACITY);
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         print!("{}", event.to_ndjson()?);
//!     }
//! });
//! let summary = run_batch(&job, &RunnerSettings::default(), Arc::new(sink), CancellationToken::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod prompts;
pub mod runner;
pub mod scheduler;
pub mod sink;

pub use prompts::{GenerationError, GenerationMode, PromptSchemaGenerator, SchemaSpec, MAX_GENERATED_PROMPTS};
pub use runner::{RequestRunner, RunnerSettings};
pub use scheduler::ConcurrencyScheduler;
pub use sink::{ChannelSink, CollectingSink, ResultSink};

use bench_core::{BatchSummary, BenchResult, Job};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run every prompt of `job` and return the batch summary.
///
/// # Errors
/// Returns [`bench_core::BenchError::Validation`] when no HTTP client can be
/// built for the job endpoint. Per-request failures are reported through
/// `sink` as error outcomes instead.
pub async fn run_batch(
    job: &Job,
    settings: &RunnerSettings,
    sink: Arc<dyn ResultSink>,
    cancel: CancellationToken,
) -> BenchResult<BatchSummary> {
    let runner = RequestRunner::for_job(job, settings)?;
    let scheduler = ConcurrencyScheduler::new(runner, job.effective_concurrency());
    Ok(scheduler.run(job.work_items(), sink, cancel).await)
}

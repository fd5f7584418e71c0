//! # Bench Core
//!
//! Core types, metrics and error handling for LLM Stream Bench.
//!
//! This crate provides the foundational types used throughout the harness:
//! - Benchmark jobs, work items and concurrency budgets
//! - Per-request stream state and throughput math
//! - Batch events and the terminal summary
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod job;
pub mod metrics;

// Re-export commonly used types
pub use error::{BenchError, BenchResult};
pub use event::{BatchEvent, ErrorOutcome, Outcome, StartedEvent, SuccessOutcome};
pub use job::{
    ConcurrencyBudget, Endpoint, Job, JobBuilder, JobLimits, JobRequest, WorkItem,
    CHAT_COMPLETIONS_PATH, DEFAULT_MAX_PROMPTS, DEFAULT_MAX_TOKENS,
};
pub use metrics::{
    tokens_per_second, BatchSummary, LatencyStats, StreamMetrics, StreamState, SummaryBuilder,
};

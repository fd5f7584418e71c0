//! # Bench Telemetry
//!
//! Observability for LLM Stream Bench.
//!
//! This crate provides:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus metrics fed from batch events
//! - A [`MetricsSink`] that records events on their way to another sink

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod sink;

pub use logging::{init_logging, LoggingConfig};
pub use metrics::BenchMetrics;
pub use sink::MetricsSink;

/// Telemetry initialization error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// A metric could not be created or registered.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

//! Prometheus metrics fed from batch events.

use crate::TelemetryError;
use bench_core::BatchEvent;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Harness metrics in a private registry.
#[derive(Clone)]
pub struct BenchMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    requests_in_flight: IntGauge,
    time_to_first_token: Histogram,
    tokens_per_second: Histogram,
    tokens_total: IntCounter,
    batches_total: IntCounter,
}

impl std::fmt::Debug for BenchMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchMetrics")
            .field("requests_in_flight", &self.requests_in_flight.get())
            .field("batches_total", &self.batches_total.get())
            .finish_non_exhaustive()
    }
}

impl BenchMetrics {
    /// Create and register every metric.
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("bench_requests_total", "Benchmark requests by terminal status"),
            &["status"],
        )?;
        let requests_in_flight = IntGauge::with_opts(Opts::new(
            "bench_requests_in_flight",
            "Benchmark requests started and not yet terminated",
        ))?;
        let time_to_first_token = Histogram::with_opts(
            HistogramOpts::new(
                "bench_time_to_first_token_seconds",
                "Time from request start to the first content fragment",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let tokens_per_second = Histogram::with_opts(
            HistogramOpts::new("bench_tokens_per_second", "Per-request generation throughput")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
        )?;
        let tokens_total = IntCounter::with_opts(Opts::new(
            "bench_tokens_total",
            "Tokens generated by successful requests",
        ))?;
        let batches_total = IntCounter::with_opts(Opts::new(
            "bench_batches_total",
            "Completed benchmark batches",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(requests_in_flight.clone()))?;
        registry.register(Box::new(time_to_first_token.clone()))?;
        registry.register(Box::new(tokens_per_second.clone()))?;
        registry.register(Box::new(tokens_total.clone()))?;
        registry.register(Box::new(batches_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            requests_in_flight,
            time_to_first_token,
            tokens_per_second,
            tokens_total,
            batches_total,
        })
    }

    /// Update the metrics for one batch event.
    pub fn record_event(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started(_) => self.requests_in_flight.inc(),
            BatchEvent::Success(success) => {
                self.requests_in_flight.dec();
                self.requests_total.with_label_values(&["success"]).inc();
                self.tokens_total.inc_by(success.total_tokens);
                self.tokens_per_second.observe(success.tokens_per_second);
                if let Some(ttft_ms) = success.time_to_first_token_ms {
                    self.time_to_first_token.observe(ttft_ms / 1000.0);
                }
            }
            BatchEvent::Error(error) => {
                self.requests_in_flight.dec();
                let status = if error.cancelled { "cancelled" } else { "error" };
                self.requests_total.with_label_values(&[status]).inc();
            }
            BatchEvent::Summary(_) => self.batches_total.inc(),
        }
    }

    /// Requests currently in flight.
    pub fn in_flight(&self) -> i64 {
        self.requests_in_flight.get()
    }

    /// Requests terminated with `status`.
    pub fn requests(&self, status: &str) -> u64 {
        self.requests_total.with_label_values(&[status]).get()
    }

    /// Encode every metric in the Prometheus text format.
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

//! Metrics-recording sink decorator.

use crate::metrics::BenchMetrics;
use async_trait::async_trait;
use bench_core::BatchEvent;
use bench_engine::ResultSink;
use std::sync::Arc;

/// Records every event in [`BenchMetrics`] before forwarding it unchanged.
pub struct MetricsSink {
    inner: Arc<dyn ResultSink>,
    metrics: Arc<BenchMetrics>,
}

impl MetricsSink {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn ResultSink>, metrics: Arc<BenchMetrics>) -> Self {
        Self { inner, metrics }
    }
}

impl std::fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSink")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResultSink for MetricsSink {
    async fn emit(&self, event: BatchEvent) {
        self.metrics.record_event(&event);
        self.inner.emit(event).await;
    }
}

//! Shared application state.

use bench_config::HarnessConfig;
use bench_telemetry::{BenchMetrics, TelemetryError};
use std::sync::Arc;
use std::time::Instant;

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Harness configuration.
    pub config: Arc<HarnessConfig>,
    /// Metrics registry.
    pub metrics: Arc<BenchMetrics>,
    /// Server start time.
    pub started_at: Instant,
}

impl AppState {
    /// Create a builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Seconds since the state was built.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Builder for [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<HarnessConfig>,
    metrics: Option<Arc<BenchMetrics>>,
}

impl AppStateBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing metrics registry.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<BenchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the state, creating a metrics registry if none was given.
    ///
    /// # Errors
    /// Returns error if the metrics registry cannot be created
    pub fn build(self) -> Result<AppState, TelemetryError> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(BenchMetrics::new()?),
        };

        Ok(AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            metrics,
            started_at: Instant::now(),
        })
    }
}

//! Per-request stream state and batch-level aggregation.
//!
//! Token counts are the number of content-delta events observed, not a
//! tokenizer count. Providers that pack several sub-word tokens into one SSE
//! frame are under-counted.

use crate::event::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Compute a throughput figure that is never negative and never divides by zero.
pub fn tokens_per_second(total_tokens: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if total_tokens == 0 || secs <= 0.0 {
        return 0.0;
    }
    total_tokens as f64 / secs
}

/// Mutable state of one in-flight request, owned by a single runner.
#[derive(Debug)]
pub struct StreamState {
    text: String,
    token_count: u64,
    started_at: Instant,
    first_content_at: Option<Instant>,
    finished: bool,
}

impl StreamState {
    /// Start tracking a request that was issued at `started_at`.
    pub fn new(started_at: Instant) -> Self {
        Self {
            text: String::new(),
            token_count: 0,
            started_at,
            first_content_at: None,
            finished: false,
        }
    }

    /// Record one content delta received at `at`.
    ///
    /// The first call pins the first-content instant. Calls after
    /// [`Self::finish`] are ignored.
    pub fn record_delta(&mut self, fragment: &str, at: Instant) {
        if self.finished {
            return;
        }
        self.first_content_at.get_or_insert(at);
        self.text.push_str(fragment);
        self.token_count += 1;
    }

    /// Record a whole, non-streamed completion.
    ///
    /// Leaves the first-content instant unset so throughput is measured from
    /// the request start.
    pub fn record_buffered(&mut self, content: &str, completion_tokens: u64) {
        if self.finished {
            return;
        }
        self.text.push_str(content);
        self.token_count += completion_tokens;
    }

    /// Accumulated text so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of tokens observed so far.
    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    /// Instant of the first observed content delta.
    pub fn first_content_at(&self) -> Option<Instant> {
        self.first_content_at
    }

    /// Whether the stream has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mark the stream terminated at `at` and compute its metrics.
    pub fn finish(&mut self, at: Instant) -> StreamMetrics {
        self.finished = true;

        let baseline = self.first_content_at.unwrap_or(self.started_at);
        let generation = at.saturating_duration_since(baseline);

        StreamMetrics {
            total_tokens: self.token_count,
            tokens_per_second: tokens_per_second(self.token_count, generation),
            time_to_first_token: self
                .first_content_at
                .map(|first| first.saturating_duration_since(self.started_at)),
            latency: at.saturating_duration_since(self.started_at),
        }
    }

    /// Consume the state, returning the trimmed generated text.
    pub fn into_text(self) -> String {
        self.text.trim().to_string()
    }
}

/// Metrics of one finished request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamMetrics {
    /// Number of content deltas (or reported completion tokens when buffered).
    pub total_tokens: u64,
    /// Tokens per second over the generation window.
    pub tokens_per_second: f64,
    /// Delay between request start and the first content delta.
    pub time_to_first_token: Option<Duration>,
    /// Delay between request start and stream termination.
    pub latency: Duration,
}

/// Mean and percentile figures, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 99th percentile.
    pub p99: f64,
}

impl LatencyStats {
    /// Compute statistics over a sample set. Empty samples yield zeros.
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let len = samples.len();
        let at = |q: f64| {
            let idx = ((len as f64 * q) as usize).min(len - 1);
            samples[idx]
        };

        Self {
            mean: samples.iter().sum::<f64>() / len as f64,
            p50: samples[len / 2],
            p90: at(0.90),
            p99: at(0.99),
        }
    }
}

/// Terminal record of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Identifier of the batch, for log correlation.
    pub batch_id: Uuid,
    /// Wall-clock time the batch started.
    pub started_at: DateTime<Utc>,
    /// Number of terminal outcomes.
    pub total: usize,
    /// Outcomes with status `success`.
    pub succeeded: usize,
    /// Outcomes with status `error`, cancelled ones included.
    pub failed: usize,
    /// Outcomes that ended because the batch was cancelled.
    pub cancelled: usize,
    /// Sum of tokens over successful outcomes.
    pub total_tokens: u64,
    /// Wall-clock duration of the batch.
    pub elapsed_ms: f64,
    /// Terminal outcomes per second of batch time.
    pub requests_per_second: f64,
    /// Total tokens per second of batch time.
    pub aggregate_tokens_per_second: f64,
    /// Mean of per-request tokens per second over successful outcomes.
    pub mean_tokens_per_second: f64,
    /// Time-to-first-token statistics over successful streamed outcomes.
    pub ttft_ms: LatencyStats,
    /// End-to-end latency statistics over all terminal outcomes.
    pub latency_ms: LatencyStats,
}

/// Accumulates outcomes into a [`BatchSummary`].
#[derive(Debug)]
pub struct SummaryBuilder {
    batch_id: Uuid,
    started_at: DateTime<Utc>,
    succeeded: usize,
    failed: usize,
    cancelled: usize,
    total_tokens: u64,
    tps_samples: Vec<f64>,
    ttft_samples: Vec<f64>,
    latency_samples: Vec<f64>,
}

impl SummaryBuilder {
    /// Start a summary for the given batch.
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            started_at: Utc::now(),
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            total_tokens: 0,
            tps_samples: Vec::new(),
            ttft_samples: Vec::new(),
            latency_samples: Vec::new(),
        }
    }

    /// Record one terminal outcome.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success(success) => {
                self.succeeded += 1;
                self.total_tokens += success.total_tokens;
                self.tps_samples.push(success.tokens_per_second);
                if let Some(ttft) = success.time_to_first_token_ms {
                    self.ttft_samples.push(ttft);
                }
                self.latency_samples.push(success.latency_ms);
            }
            Outcome::Error(error) => {
                self.failed += 1;
                if error.cancelled {
                    self.cancelled += 1;
                }
                self.latency_samples.push(error.latency_ms);
            }
        }
    }

    /// Finish the summary with the batch wall-clock duration.
    pub fn finish(self, elapsed: Duration) -> BatchSummary {
        let total = self.succeeded + self.failed;
        let secs = elapsed.as_secs_f64();
        let per_second = |n: f64| if secs > 0.0 { n / secs } else { 0.0 };
        let mean_tps = if self.tps_samples.is_empty() {
            0.0
        } else {
            self.tps_samples.iter().sum::<f64>() / self.tps_samples.len() as f64
        };

        BatchSummary {
            batch_id: self.batch_id,
            started_at: self.started_at,
            total,
            succeeded: self.succeeded,
            failed: self.failed,
            cancelled: self.cancelled,
            total_tokens: self.total_tokens,
            elapsed_ms: secs * 1000.0,
            requests_per_second: per_second(total as f64),
            aggregate_tokens_per_second: tokens_per_second(self.total_tokens, elapsed),
            mean_tokens_per_second: mean_tps,
            ttft_ms: LatencyStats::from_samples(self.ttft_samples),
            latency_ms: LatencyStats::from_samples(self.latency_samples),
        }
    }
}

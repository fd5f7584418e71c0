//! Batch events delivered to the caller, one NDJSON record each.

use crate::job::WorkItem;
use crate::metrics::{BatchSummary, StreamMetrics};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Liveness notification emitted before a work item's request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedEvent {
    /// 1-based work item index.
    pub index: usize,
    /// Prompt text.
    pub prompt: String,
}

/// Terminal record of a successful request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessOutcome {
    /// 1-based work item index.
    pub index: usize,
    /// Prompt text.
    pub prompt: String,
    /// Generated text, trimmed.
    pub generated_text: String,
    /// Number of tokens observed.
    pub total_tokens: u64,
    /// Tokens per second over the generation window.
    pub tokens_per_second: f64,
    /// Time to first content delta; absent for buffered responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_token_ms: Option<f64>,
    /// End-to-end latency.
    pub latency_ms: f64,
}

impl SuccessOutcome {
    /// Build a success record from finished stream metrics.
    pub fn from_metrics(item: WorkItem, generated_text: String, metrics: &StreamMetrics) -> Self {
        Self {
            index: item.index,
            prompt: item.prompt,
            generated_text,
            total_tokens: metrics.total_tokens,
            tokens_per_second: metrics.tokens_per_second,
            time_to_first_token_ms: metrics.time_to_first_token.map(millis),
            latency_ms: millis(metrics.latency),
        }
    }
}

/// Terminal record of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutcome {
    /// 1-based work item index.
    pub index: usize,
    /// Prompt text.
    pub prompt: String,
    /// Failure description.
    pub error: String,
    /// Set when the failure was caused by batch cancellation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
    /// Time spent before the failure surfaced.
    pub latency_ms: f64,
}

impl ErrorOutcome {
    /// Build an error record.
    pub fn new(item: WorkItem, error: impl Into<String>, latency: Duration) -> Self {
        Self {
            index: item.index,
            prompt: item.prompt,
            error: error.into(),
            cancelled: false,
            latency_ms: millis(latency),
        }
    }

    /// Build a record for a request aborted by cancellation.
    pub fn cancelled(item: WorkItem, latency: Duration) -> Self {
        Self {
            cancelled: true,
            ..Self::new(item, "cancelled", latency)
        }
    }
}

/// Terminal outcome of one work item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request completed.
    Success(SuccessOutcome),
    /// The request failed; the failure is captured as data.
    Error(ErrorOutcome),
}

impl Outcome {
    /// 1-based index of the work item this outcome belongs to.
    pub fn index(&self) -> usize {
        match self {
            Self::Success(s) => s.index,
            Self::Error(e) => e.index,
        }
    }

    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Status label as it appears on the wire.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

/// One record in the event sequence of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BatchEvent {
    /// A work item was admitted and its request is about to be issued.
    Started(StartedEvent),
    /// A work item completed.
    Success(SuccessOutcome),
    /// A work item failed.
    Error(ErrorOutcome),
    /// The batch finished; always the last record.
    Summary(BatchSummary),
}

impl BatchEvent {
    /// Create a `started` event for a work item.
    pub fn started(item: &WorkItem) -> Self {
        Self::Started(StartedEvent {
            index: item.index,
            prompt: item.prompt.clone(),
        })
    }

    /// Work item index, when the event belongs to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Started(e) => Some(e.index),
            Self::Success(e) => Some(e.index),
            Self::Error(e) => Some(e.index),
            Self::Summary(_) => None,
        }
    }

    /// Whether this is a terminal per-item record.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Serialize as one newline-terminated JSON record.
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<Outcome> for BatchEvent {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(s) => Self::Success(s),
            Outcome::Error(e) => Self::Error(e),
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

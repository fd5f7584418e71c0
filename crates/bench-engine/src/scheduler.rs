//! Bounded-parallelism dispatch of work items.
//!
//! One coordinating task owns the admission state. Each admitted item runs on
//! its own spawned task; the coordinator waits for any of them to finish,
//! emits its outcome, and only then admits the next queued item. The number
//! of `started` events without a terminal event therefore never exceeds the
//! budget.

use crate::runner::RequestRunner;
use crate::sink::ResultSink;
use bench_core::{BatchEvent, BatchSummary, ErrorOutcome, Outcome, SummaryBuilder, WorkItem};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Admission counters, owned by the coordinator.
#[derive(Debug)]
struct AdmissionState {
    pending: std::vec::IntoIter<WorkItem>,
    budget: usize,
    running: usize,
    completed: usize,
}

impl AdmissionState {
    fn new(items: Vec<WorkItem>, budget: usize) -> Self {
        Self {
            pending: items.into_iter(),
            budget,
            running: 0,
            completed: 0,
        }
    }

    /// Next item in index order, if a slot is free.
    fn admit(&mut self) -> Option<WorkItem> {
        if self.running >= self.budget {
            return None;
        }
        let item = self.pending.next()?;
        self.running += 1;
        Some(item)
    }

    fn complete(&mut self) {
        self.running = self.running.saturating_sub(1);
        self.completed += 1;
    }

    fn remaining(&self) -> usize {
        self.pending.len()
    }
}

/// Executes every work item exactly once within a parallelism budget.
#[derive(Debug, Clone)]
pub struct ConcurrencyScheduler {
    runner: Arc<RequestRunner>,
    budget: usize,
    batch_id: Uuid,
}

impl ConcurrencyScheduler {
    /// Create a scheduler admitting at most `budget` items at a time.
    ///
    /// A zero budget is raised to one.
    pub fn new(runner: RequestRunner, budget: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            budget: budget.max(1),
            batch_id: Uuid::new_v4(),
        }
    }

    /// Use a caller-chosen batch identifier.
    #[must_use]
    pub fn with_batch_id(mut self, batch_id: Uuid) -> Self {
        self.batch_id = batch_id;
        self
    }

    /// Identifier reported in the summary and log records.
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Resolved parallelism budget.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Run the batch to completion.
    ///
    /// Events go to `sink` in production order, ending with one `summary`
    /// event whose value is also returned. Once `cancel` fires no further
    /// item is admitted and in-flight items resolve as cancelled errors.
    #[instrument(skip_all, fields(batch_id = %self.batch_id, items = items.len(), budget = self.budget))]
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        sink: Arc<dyn ResultSink>,
        cancel: CancellationToken,
    ) -> BatchSummary {
        info!("Starting batch");

        let clock = Instant::now();
        let mut state = AdmissionState::new(items, self.budget);
        let mut summary = SummaryBuilder::new(self.batch_id);
        let mut in_flight = FuturesUnordered::new();

        loop {
            if !cancel.is_cancelled() {
                while let Some(item) = state.admit() {
                    debug!(index = item.index, running = state.running, "Admitting work item");
                    in_flight.push(self.spawn(item, Arc::clone(&sink), cancel.clone()));
                }
            }

            let Some((item, admitted_at, joined)) = in_flight.next().await else {
                break;
            };
            state.complete();

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => runner_crashed(item, admitted_at, &e),
            };
            summary.record(&outcome);
            sink.emit(BatchEvent::from(outcome)).await;
        }

        if state.remaining() > 0 {
            info!(skipped = state.remaining(), "Batch cancelled before every item was admitted");
        }

        let summary = summary.finish(clock.elapsed());
        info!(
            completed = state.completed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "Batch finished"
        );
        sink.emit(BatchEvent::Summary(summary.clone())).await;
        summary
    }

    fn spawn(
        &self,
        item: WorkItem,
        sink: Arc<dyn ResultSink>,
        cancel: CancellationToken,
    ) -> impl Future<Output = (WorkItem, Instant, Result<Outcome, JoinError>)> {
        let runner = Arc::clone(&self.runner);
        let admitted_at = Instant::now();
        let task_item = item.clone();
        let handle = tokio::spawn(async move { runner.run(task_item, sink.as_ref(), &cancel).await });
        async move { (item, admitted_at, handle.await) }
    }
}

fn runner_crashed(item: WorkItem, admitted_at: Instant, e: &JoinError) -> Outcome {
    error!(index = item.index, error = %e, "Runner task failed");
    Outcome::Error(ErrorOutcome::new(
        item,
        format!("runner task failed: {e}"),
        admitted_at.elapsed(),
    ))
}

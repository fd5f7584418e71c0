//! Destinations for batch events.

use async_trait::async_trait;
use bench_core::BatchEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives batch events in production order.
///
/// Implementations forward each event as soon as it arrives: no batching and
/// no reordering.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver one event.
    async fn emit(&self, event: BatchEvent);
}

/// Forwards events into a bounded channel.
///
/// All runners share one sender, so records never interleave. A full channel
/// applies backpressure to the producers.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BatchEvent>,
}

impl ChannelSink {
    /// Default channel capacity.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a sink and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BatchEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a sink over an existing sender.
    pub fn from_sender(tx: mpsc::Sender<BatchEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn emit(&self, event: BatchEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<BatchEvent>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().clone()
    }

    /// Number of events received so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no event has been received.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl ResultSink for CollectingSink {
    async fn emit(&self, event: BatchEvent) {
        self.events.lock().push(event);
    }
}

//! Incremental server-sent-event parsing for chat-completion streams.
//!
//! Chunk boundaries are arbitrary: a chunk may end in the middle of a line or
//! of a UTF-8 sequence. Bytes are buffered and only complete `\n`-terminated
//! lines are decoded, which is safe because `\n` never occurs inside a
//! multi-byte UTF-8 sequence.

use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use pin_project_lite::pin_project;
use serde::Deserialize;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Marker payload that ends a stream.
const DONE_MARKER: &str = "[DONE]";

/// Longest line the parser buffers; longer lines are skipped.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One event produced from a chat-completion stream.
///
/// A well-formed sequence is zero or more `ContentDelta`s followed by exactly
/// one `Done` or `StreamError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of generated text.
    ContentDelta(String),
    /// The stream ended, by `[DONE]` or by the connection closing.
    Done,
    /// The transport failed mid-stream.
    StreamError(String),
}

impl StreamEvent {
    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::StreamError(_))
    }
}

/// The subset of a `chat.completion.chunk` the parser reads.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamChunk {
    fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.delta.content)
    }
}

/// Synchronous, push-based SSE line parser.
///
/// Feed it raw body chunks with [`SseParser::feed`] and call
/// [`SseParser::finish`] when the transport ends. Once `Done` has been
/// produced all further input is ignored.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to hold no `\n`.
    scanned: usize,
    /// Dropping the remainder of an oversized line.
    discarding: bool,
    done: bool,
}

impl SseParser {
    /// Create a parser with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `Done` has already been produced.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume one chunk, returning the events completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buffer.extend_from_slice(chunk);
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
                self.scanned = self.buffer.len();
                if self.scanned > MAX_LINE_BYTES {
                    debug!(bytes = self.scanned, "Skipping oversized SSE line");
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                }
                break;
            };
            let pos = self.scanned + offset;
            let line = self.buffer.split_to(pos + 1);
            self.scanned = 0;
            if self.discarding {
                self.discarding = false;
                continue;
            }
            match parse_line(&line[..pos]) {
                Some(StreamEvent::Done) => {
                    self.done = true;
                    self.buffer.clear();
                    events.push(StreamEvent::Done);
                    break;
                }
                Some(event) => events.push(event),
                None => {}
            }
        }
        events
    }

    /// Signal the end of the transport.
    ///
    /// A residual unterminated line is parsed, then `Done` is produced unless
    /// it already was.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;

        let rest = self.buffer.split();
        let mut events = Vec::with_capacity(2);
        if !self.discarding {
            if let Some(StreamEvent::ContentDelta(text)) = parse_line(&rest) {
                events.push(StreamEvent::ContentDelta(text));
            }
        }
        events.push(StreamEvent::Done);
        events
    }
}

/// Interpret one complete line, without its `\n`.
fn parse_line(line: &[u8]) -> Option<StreamEvent> {
    let line = line.strip_suffix(&b"\r"[..]).unwrap_or(line);
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            debug!(error = %e, "Skipping SSE line with invalid UTF-8");
            return None;
        }
    };

    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.trim() == DONE_MARKER {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .into_content()
            .filter(|content| !content.is_empty())
            .map(StreamEvent::ContentDelta),
        Err(e) => {
            debug!(error = %e, data, "Skipping malformed SSE data line");
            None
        }
    }
}

/// Turn a raw body byte stream into a lazy sequence of [`StreamEvent`]s.
///
/// Stops pulling from `body` as soon as a terminal event is produced.
pub fn parse_event_stream<S, E>(body: S) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Display + Send,
{
    async_stream::stream! {
        let mut body = std::pin::pin!(body);
        let mut parser = SseParser::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        yield event;
                    }
                    if parser.is_done() {
                        return;
                    }
                }
                Err(e) => {
                    let cause = e.to_string();
                    yield StreamEvent::StreamError(cause);
                    return;
                }
            }
        }

        for event in parser.finish() {
            yield event;
        }
    }
}

pin_project! {
    /// A fused stream of chat-completion events.
    ///
    /// Yields exactly one terminal event, then `None` forever.
    pub struct EventStream {
        #[pin]
        inner: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
        terminated: bool,
    }
}

impl EventStream {
    /// Create an event stream from a response body.
    pub fn new<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Self {
            inner: Box::pin(parse_event_stream(body)),
            terminated: false,
        }
    }

    /// Whether the terminal event has been yielded.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    *this.terminated = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                *this.terminated = true;
                Poll::Ready(Some(StreamEvent::Done))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

//! # Bench client
//!
//! Chat-completions client used by the benchmark engine.
//!
//! ## Features
//!
//! - One request per call, no retries: a failed attempt is a data point
//! - Incremental SSE parsing that tolerates arbitrary chunk boundaries
//! - Buffered (non-streaming) completions with usage reporting
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use bench_client::{ChatRequest, Client, Message, StreamEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bench_client::Error> {
//!     let client = Client::builder()
//!         .base_url("http://localhost:8000")
//!         .api_key("sk-local")
//!         .build()?;
//!
//!     let request = ChatRequest::new("llama-3", vec![Message::user("Tell me a story")])
//!         .with_max_tokens(100);
//!     let mut events = client.chat_completion_stream(&request).await?;
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             StreamEvent::ContentDelta(text) => print!("{text}"),
//!             StreamEvent::Done => break,
//!             StreamEvent::StreamError(cause) => eprintln!("stream failed: {cause}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod config;
mod error;
mod request;
mod response;
mod streaming;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use request::{ChatRequest, Message, MessageRole};
pub use response::{ChatChoice, ChatMessage, ChatResponse, Usage};
pub use streaming::{parse_event_stream, EventStream, SseParser, StreamEvent};

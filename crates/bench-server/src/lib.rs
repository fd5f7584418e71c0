//! # Bench Server
//!
//! HTTP front-end for LLM Stream Bench.
//!
//! This crate provides:
//! - `POST /api/benchmark` (alias `/api/test-concurrency`), streaming batch
//!   events as NDJSON
//! - `POST /api/generate-prompts`
//! - `GET /health` and `GET /metrics`
//! - Static asset fallback and graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use error::ApiError;
pub use handlers::{GeneratePromptsRequest, GeneratePromptsResponse, HealthResponse};
pub use routes::create_router;
pub use server::Server;
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder};

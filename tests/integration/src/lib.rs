//! Integration tests for LLM Stream Bench
//!
//! This crate covers:
//! - HTTP API validation and error envelopes
//! - End-to-end NDJSON benchmark streaming
//! - Prompt generation in strict and lenient modes
//! - Engine-level concurrency and cancellation behavior

pub mod fixtures;
pub mod helpers;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_providers::*;

#[cfg(test)]
mod api_tests;
#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod engine_tests;

//! # LLM Stream Bench
//!
//! Concurrent streaming benchmark harness for OpenAI-compatible inference
//! APIs, served over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! llm-stream-bench
//!
//! # Start with a config file
//! BENCH_CONFIG=/path/to/bench.yaml llm-stream-bench
//!
//! # Start with environment overrides
//! BENCH_PORT=9000 BENCH_LOG_JSON=true llm-stream-bench
//! ```

use anyhow::{Context, Result};
use bench_config::{ConfigLoader, HarnessConfig};
use bench_server::{AppState, Server};
use std::env;
use tracing::{error, info};

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "BENCH_CONFIG";

/// Application entry point
#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = bench_telemetry::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting LLM Stream Bench"
    );

    if let Err(e) = run(config).await {
        error!(error = %format!("{e:#}"), "Application failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(config: HarnessConfig) -> Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        max_prompts = config.job.max_prompts,
        request_timeout = ?config.client.request_timeout,
        "Configuration loaded"
    );

    let state = AppState::builder()
        .config(config)
        .build()
        .context("Failed to initialize metrics")?;

    Server::new(state).run().await.context("Server error")
}

/// Load configuration from `BENCH_CONFIG` (if set) and the environment.
async fn load_config() -> Result<HarnessConfig> {
    let mut loader = ConfigLoader::new();
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            loader = loader.with_file(path);
        }
    }
    loader.load().await.context("Invalid configuration")
}

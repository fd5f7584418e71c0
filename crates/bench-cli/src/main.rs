//! LLM Stream Bench CLI
//!
//! Command-line interface for running streaming benchmarks against
//! OpenAI-compatible endpoints.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    cli.execute().await
}

/// Initialize logging based on verbosity and format.
fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let config = bench_telemetry::LoggingConfig::new(level).with_json(json);
    if let Err(e) = bench_telemetry::init_logging(&config) {
        output::warning(&e.to_string());
    }
}

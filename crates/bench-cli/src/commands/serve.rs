//! Serve command - launches the HTTP front-end.

use anyhow::{Context, Result};
use bench_config::HarnessConfig;
use clap::Args;
use std::path::PathBuf;

use crate::output;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of static assets served for unknown paths
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: HarnessConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = Some(dir);
    }

    let state = bench_server::AppState::builder()
        .config(config)
        .build()
        .context("Failed to initialize metrics")?;
    let server = bench_server::Server::new(state);

    output::success(&format!("Serving on {}", server.bind_address()));
    output::info("Press Ctrl+C to stop");

    server.run().await.context("Server error")?;

    output::info("Server stopped");
    Ok(())
}

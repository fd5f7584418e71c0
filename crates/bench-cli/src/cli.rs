//! CLI argument definitions using clap.

use anyhow::{Context, Result};
use bench_config::{ConfigLoader, HarnessConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::{commands, output};

/// LLM Stream Bench - concurrent streaming benchmarks for chat-completions APIs
#[derive(Parser, Debug)]
#[command(name = "llm-bench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (YAML or TOML)
    #[arg(short, long, env = "BENCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark batch against an endpoint
    Run(commands::run::RunArgs),

    /// Generate a prompt list with a structured-output request
    Generate(commands::generate::GenerateArgs),

    /// Start the HTTP front-end
    #[command(visible_alias = "start")]
    Serve(commands::serve::ServeArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref(), self.json).await?;
        match self.command {
            Commands::Run(args) => commands::run::execute(args, &config, self.json).await,
            Commands::Generate(args) => commands::generate::execute(args, &config, self.json).await,
            Commands::Serve(args) => commands::serve::execute(args, config).await,
        }
    }
}

/// Load configuration from file and environment, or defaults.
async fn load_config(path: Option<&Path>, json: bool) -> Result<HarnessConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        if !json {
            output::info(&format!("Loading configuration from {}", path.display()));
        }
        loader = loader.with_file(path);
    }
    loader.load().await.context("Failed to load configuration")
}

//! Generate command - asks a model for a benchmark prompt list.

use anyhow::{Context, Result};
use bench_client::Client;
use bench_config::HarnessConfig;
use bench_core::Endpoint;
use bench_engine::{GenerationError, GenerationMode, PromptSchemaGenerator};
use clap::Args;
use std::path::PathBuf;

use crate::output;

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// What the prompts should exercise
    pub instructions: String,

    /// Base URL of the generating API
    #[arg(short = 'u', long, env = "BENCH_API_URL")]
    pub api_url: String,

    /// Bearer credential for the generating API
    #[arg(short = 'k', long, env = "BENCH_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model identifier (defaults to the configured generator model)
    #[arg(short, long, env = "BENCH_GENERATOR_MODEL")]
    pub model: Option<String>,

    /// Number of prompts wanted
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Output handling: strict or lenient
    #[arg(long)]
    pub mode: Option<GenerationMode>,

    /// Write the prompts to this file as a JSON array
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let model = args
        .model
        .or_else(|| config.generator.model.clone())
        .context("No model given and no generator model configured")?;
    let mode = args.mode.unwrap_or(config.generator.default_mode);
    let count = args.count.clamp(1, config.generator.max_prompts);

    let endpoint = Endpoint::new(&args.api_url, args.api_key).context("Invalid endpoint")?;
    let client = Client::for_endpoint(
        &endpoint,
        config.client.request_timeout,
        config.client.connect_timeout,
    )
    .context("Failed to create HTTP client")?;

    let spinner = (!json).then(|| {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_message(format!("Generating {count} prompts with {model} ({mode})"));
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar
    });

    let result = PromptSchemaGenerator::new(client, model)
        .generate(&args.instructions, count, mode)
        .await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let prompts = match result {
        Ok(prompts) => prompts,
        Err(GenerationError::SchemaValidationFailed { diagnostics }) => {
            if !json {
                output::error("Generated output did not match the prompt schema");
                for diagnostic in &diagnostics {
                    output::key_value("diagnostic", diagnostic);
                }
            }
            anyhow::bail!("Schema validation failed ({} problems)", diagnostics.len());
        }
        Err(e) => return Err(e).context("Prompt generation failed"),
    };

    if let Some(path) = &args.output {
        let contents = serde_json::to_string_pretty(&prompts)?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !json {
            output::success(&format!("Wrote {} prompts to {}", prompts.len(), path.display()));
        }
    }

    if json {
        return output::json(&prompts);
    }

    output::section("Prompts");
    for (i, prompt) in prompts.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, prompt);
    }
    Ok(())
}

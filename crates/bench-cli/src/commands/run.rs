//! Run command - executes a benchmark batch from the terminal.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bench_config::HarnessConfig;
use bench_core::{BatchEvent, BatchSummary, ConcurrencyBudget, JobRequest};
use bench_engine::{run_batch, ResultSink};
use clap::Args;
use colored::Colorize;
use indicatif::ProgressBar;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use crate::output;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Prompt to send (repeatable)
    #[arg(short, long)]
    pub prompt: Vec<String>,

    /// File with one prompt per line, or a JSON array of prompts
    #[arg(short = 'f', long)]
    pub prompts_file: Option<PathBuf>,

    /// Repeat a single prompt this many times
    #[arg(short = 'n', long)]
    pub requests: Option<usize>,

    /// Base URL of the target API
    #[arg(short = 'u', long, env = "BENCH_API_URL")]
    pub api_url: String,

    /// Bearer credential for the target API
    #[arg(short = 'k', long, env = "BENCH_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model identifier
    #[arg(short, long, env = "BENCH_MODEL")]
    pub model: String,

    /// Completion token cap per request
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Parallelism budget (defaults to one slot per prompt)
    #[arg(long)]
    pub concurrency: Option<String>,

    /// Read whole responses instead of SSE streams
    #[arg(long)]
    pub no_stream: bool,

    /// Per-request timeout (e.g. "30s", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl RunArgs {
    /// Assemble the wire-form job request.
    async fn job_request(&self) -> Result<JobRequest> {
        let mut prompts = self.prompt.clone();
        if let Some(path) = &self.prompts_file {
            prompts.extend(read_prompts_file(path).await?);
        }

        let mut request = JobRequest {
            api_url: Some(self.api_url.clone()),
            api_key: Some(self.api_key.clone()),
            model: Some(self.model.clone()),
            max_tokens: self.max_tokens,
            concurrency: self
                .concurrency
                .as_deref()
                .map(|value| ConcurrencyBudget::from_value(Some(&serde_json::Value::from(value))))
                .unwrap_or_default(),
            stream: self.no_stream.then_some(false),
            ..Default::default()
        };

        match (self.requests, prompts.len()) {
            (Some(n), 1) => {
                request.prompt = prompts.pop();
                request.num_requests = Some(n);
            }
            (Some(_), _) => bail!("--requests needs exactly one prompt"),
            (None, _) => request.prompts = Some(prompts),
        }
        Ok(request)
    }
}

/// Read prompts from a file: a JSON array of strings, or one prompt per line.
async fn read_prompts_file(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompts file {}", path.display()))?;

    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a JSON array of strings", path.display()));
    }

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Table row for per-request results.
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Tokens")]
    tokens: String,
    #[tabled(rename = "Tokens/s")]
    tokens_per_second: String,
    #[tabled(rename = "TTFT")]
    ttft: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Output")]
    output: String,
}

impl ResultRow {
    fn from_event(event: &BatchEvent) -> Option<Self> {
        match event {
            BatchEvent::Success(s) => Some(Self {
                index: s.index,
                status: "success".green().to_string(),
                tokens: s.total_tokens.to_string(),
                tokens_per_second: format!("{:.1}", s.tokens_per_second),
                ttft: s.time_to_first_token_ms.map_or_else(|| "-".to_string(), output::millis),
                latency: output::millis(s.latency_ms),
                output: output::truncate(&s.generated_text, 48),
            }),
            BatchEvent::Error(e) => Some(Self {
                index: e.index,
                status: if e.cancelled {
                    "cancelled".yellow().to_string()
                } else {
                    "error".red().to_string()
                },
                tokens: "-".to_string(),
                tokens_per_second: "-".to_string(),
                ttft: "-".to_string(),
                latency: output::millis(e.latency_ms),
                output: output::truncate(&e.error, 48),
            }),
            BatchEvent::Started(_) | BatchEvent::Summary(_) => None,
        }
    }
}

/// Prints events as they arrive and keeps terminal outcomes for the table.
struct ConsoleSink {
    json: bool,
    progress: Option<ProgressBar>,
    outcomes: Mutex<Vec<BatchEvent>>,
}

impl ConsoleSink {
    fn new(json: bool, total: usize) -> Self {
        Self {
            json,
            progress: (!json).then(|| output::progress_bar(total as u64)),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    fn into_rows(self) -> Vec<ResultRow> {
        let mut rows: Vec<ResultRow> = self
            .outcomes
            .into_inner()
            .iter()
            .filter_map(ResultRow::from_event)
            .collect();
        rows.sort_by_key(|row| row.index);
        rows
    }
}

#[async_trait]
impl ResultSink for ConsoleSink {
    async fn emit(&self, event: BatchEvent) {
        if self.json {
            match event.to_ndjson() {
                Ok(line) => output::ndjson_line(&line),
                Err(e) => tracing::error!(error = %e, "Failed to encode event"),
            }
            return;
        }

        let Some(progress) = &self.progress else {
            return;
        };
        match &event {
            BatchEvent::Started(s) => {
                progress.set_message(format!("#{} {}", s.index, output::truncate(&s.prompt, 32)));
            }
            BatchEvent::Success(s) => {
                progress.println(format!(
                    "{} #{} {} tokens, {:.1} tok/s",
                    "✓".green().bold(),
                    s.index,
                    s.total_tokens,
                    s.tokens_per_second
                ));
                progress.inc(1);
            }
            BatchEvent::Error(e) => {
                progress.println(format!("{} #{} {}", "✗".red().bold(), e.index, e.error));
                progress.inc(1);
            }
            BatchEvent::Summary(_) => progress.finish_and_clear(),
        }

        if event.is_terminal() {
            self.outcomes.lock().push(event);
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let job = args
        .job_request()
        .await?
        .into_job(&config.job.limits())
        .context("Invalid benchmark job")?;

    let mut settings = config.client.runner_settings();
    if let Some(timeout) = args.timeout {
        settings.request_timeout = timeout;
    }

    if !json {
        output::info(&format!(
            "Running {} requests against {} (model {}, concurrency {})",
            job.len(),
            job.endpoint().base_url(),
            job.model(),
            job.effective_concurrency()
        ));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let sink = Arc::new(ConsoleSink::new(json, job.len()));
    let result = run_batch(&job, &settings, sink.clone(), cancel.clone()).await;
    ctrl_c.abort();
    let summary = result.context("Failed to start benchmark")?;

    if json {
        return Ok(());
    }

    if cancel.is_cancelled() {
        output::warning("Interrupted, in-flight requests were cancelled");
    }

    match Arc::try_unwrap(sink) {
        Ok(sink) => {
            output::section("Results");
            output::table(&sink.into_rows());
        }
        Err(_) => tracing::debug!("Result sink still shared, skipping table"),
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    output::section("Summary");
    output::key_value("Requests", &summary.total.to_string());
    output::key_value(
        "Succeeded",
        &summary.succeeded.to_string().green().to_string(),
    );
    let failed = summary.failed.to_string();
    output::key_value(
        "Failed",
        &if summary.failed > 0 { failed.red().to_string() } else { failed },
    );
    if summary.cancelled > 0 {
        output::key_value("Cancelled", &summary.cancelled.to_string());
    }
    output::key_value("Total tokens", &summary.total_tokens.to_string());
    output::key_value("Elapsed", &output::millis(summary.elapsed_ms));
    output::key_value("Requests/s", &format!("{:.2}", summary.requests_per_second));
    output::key_value(
        "Aggregate tokens/s",
        &format!("{:.1}", summary.aggregate_tokens_per_second),
    );
    output::key_value("Mean tokens/s", &format!("{:.1}", summary.mean_tokens_per_second));
    output::key_value(
        "TTFT p50 / p90 / p99",
        &format!(
            "{} / {} / {}",
            output::millis(summary.ttft_ms.p50),
            output::millis(summary.ttft_ms.p90),
            output::millis(summary.ttft_ms.p99)
        ),
    );
    output::key_value(
        "Latency p50 / p90 / p99",
        &format!(
            "{} / {} / {}",
            output::millis(summary.latency_ms.p50),
            output::millis(summary.latency_ms.p90),
            output::millis(summary.latency_ms.p99)
        ),
    );

    if summary.failed == 0 {
        output::success("All requests succeeded");
    } else {
        output::error(&format!("{} of {} requests failed", summary.failed, summary.total));
    }
}

//! Benchmark jobs and the work items derived from them.
//!
//! A [`Job`] is immutable once built. The HTTP front-end and the CLI both
//! accept the looser [`JobRequest`] wire form and convert it with
//! [`JobRequest::into_job`], which rejects malformed input before any
//! network activity happens.

use crate::error::{BenchError, BenchResult};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

/// Default per-request completion token cap.
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Default upper bound on the number of prompts a single job may carry.
pub const DEFAULT_MAX_PROMPTS: usize = 10_000;

/// Path of the chat-completions endpoint, relative to the base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Requested parallelism for a batch.
///
/// The caller-supplied value is deliberately loose: anything that is not a
/// positive integer means "admit every item at once".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum ConcurrencyBudget {
    /// Admit all work items simultaneously.
    #[default]
    Unbounded,
    /// Admit at most this many work items at a time (always >= 1).
    Limit(usize),
}

impl ConcurrencyBudget {
    /// Build a budget from an integer, treating zero and negatives as unbounded.
    pub fn from_i64(value: i64) -> Self {
        usize::try_from(value)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Self::Unbounded, Self::Limit)
    }

    /// Build a budget from an optional raw JSON value.
    ///
    /// Numbers and numeric strings are honoured; `null`, booleans, arrays,
    /// objects and non-numeric strings fall back to [`Self::Unbounded`].
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        use serde_json::Value;

        match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map_or(Self::Unbounded, Self::from_i64),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_or(Self::Unbounded, Self::from_i64),
            _ => Self::Unbounded,
        }
    }

    /// Resolve the effective number of concurrent slots for `item_count` items.
    ///
    /// The result is always in `[1, item_count]` for non-empty batches and `0`
    /// for empty ones.
    pub fn resolve(self, item_count: usize) -> usize {
        if item_count == 0 {
            return 0;
        }
        match self {
            Self::Unbounded => item_count,
            Self::Limit(n) => n.clamp(1, item_count),
        }
    }
}

impl From<serde_json::Value> for ConcurrencyBudget {
    fn from(value: serde_json::Value) -> Self {
        Self::from_value(Some(&value))
    }
}

impl From<ConcurrencyBudget> for serde_json::Value {
    fn from(budget: ConcurrencyBudget) -> Self {
        match budget {
            ConcurrencyBudget::Unbounded => Self::from(0u64),
            ConcurrencyBudget::Limit(n) => Self::from(n as u64),
        }
    }
}

/// Target endpoint and the credential used to reach it.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base_url: Url,
    api_key: Secret<String>,
}

impl Endpoint {
    /// Create an endpoint from a base URL and API key.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> BenchResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| BenchError::Validation {
            message: format!("Invalid apiUrl '{base_url}': {e}"),
            fields: vec!["apiUrl".to_string()],
        })?;

        Ok(Self {
            base_url,
            api_key: Secret::new(api_key.into()),
        })
    }

    /// Base URL of the target API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Expose the API key for use in a request header.
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// One prompt bound to its 1-based position in the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 1-based index of the prompt in the original job.
    pub index: usize,
    /// Prompt text.
    pub prompt: String,
}

impl WorkItem {
    /// Create a work item.
    pub fn new(index: usize, prompt: impl Into<String>) -> Self {
        Self {
            index,
            prompt: prompt.into(),
        }
    }
}

/// An accepted benchmark job. Immutable once built.
#[derive(Debug, Clone)]
pub struct Job {
    prompts: Vec<String>,
    endpoint: Endpoint,
    model: String,
    max_tokens: u32,
    concurrency: ConcurrencyBudget,
    stream: bool,
}

impl Job {
    /// Create a new builder for `Job`
    #[must_use]
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }

    /// Prompts in submission order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Model identifier sent upstream.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Per-request completion token cap.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Requested concurrency budget, before resolution.
    pub fn concurrency(&self) -> ConcurrencyBudget {
        self.concurrency
    }

    /// Whether responses are consumed as SSE streams.
    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Number of work items in this job.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// A built job always has at least one prompt.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Effective number of concurrent slots for this job.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.resolve(self.prompts.len())
    }

    /// Work items in index order.
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| WorkItem::new(i + 1, prompt.clone()))
            .collect()
    }
}

/// Builder for [`Job`].
#[derive(Debug, Default)]
pub struct JobBuilder {
    prompts: Vec<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    concurrency: ConcurrencyBudget,
    stream: Option<bool>,
}

impl JobBuilder {
    /// Add one prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompts.push(prompt.into());
        self
    }

    /// Add several prompts.
    #[must_use]
    pub fn prompts<I, S>(mut self, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prompts.extend(prompts.into_iter().map(Into::into));
        self
    }

    /// Set the target base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the per-request token cap.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the concurrency budget.
    #[must_use]
    pub fn concurrency(mut self, budget: ConcurrencyBudget) -> Self {
        self.concurrency = budget;
        self
    }

    /// Enable or disable SSE streaming.
    #[must_use]
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Build the job.
    ///
    /// # Errors
    /// Returns [`BenchError::Validation`] if a required field is missing, the
    /// prompt list is empty or the base URL does not parse.
    pub fn build(self) -> BenchResult<Job> {
        let mut missing = Vec::new();
        if self.base_url.as_deref().map_or(true, str::is_empty) {
            missing.push("apiUrl".to_string());
        }
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            missing.push("apiKey".to_string());
        }
        if self.model.as_deref().map_or(true, str::is_empty) {
            missing.push("model".to_string());
        }
        if self.prompts.is_empty() {
            missing.push("prompts".to_string());
        }
        if !missing.is_empty() {
            return Err(BenchError::missing_fields(missing));
        }

        let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(BenchError::Validation {
                message: "maxTokens must be at least 1".to_string(),
                fields: vec!["maxTokens".to_string()],
            });
        }

        let endpoint = Endpoint::new(
            self.base_url.as_deref().unwrap_or_default(),
            self.api_key.unwrap_or_default(),
        )?;

        Ok(Job {
            prompts: self.prompts,
            endpoint,
            model: self.model.unwrap_or_default(),
            max_tokens,
            concurrency: self.concurrency,
            stream: self.stream.unwrap_or(true),
        })
    }
}

/// Limits and defaults applied when converting a [`JobRequest`].
#[derive(Debug, Clone, Copy)]
pub struct JobLimits {
    /// Token cap used when the request does not carry one.
    pub default_max_tokens: u32,
    /// Streaming mode used when the request does not say.
    pub default_stream: bool,
    /// Maximum number of prompts accepted per job.
    pub max_prompts: usize,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            default_max_tokens: DEFAULT_MAX_TOKENS,
            default_stream: true,
            max_prompts: DEFAULT_MAX_PROMPTS,
        }
    }
}

/// Wire form of a benchmarking job, as submitted by a caller.
///
/// Accepts either an explicit `prompts` list or a single `prompt` repeated
/// `numRequests` times.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Explicit prompt list.
    #[serde(default)]
    pub prompts: Option<Vec<String>>,

    /// Single prompt, repeated `num_requests` times.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Number of repetitions of `prompt`.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub num_requests: Option<usize>,

    /// Base URL of the target API.
    #[serde(default)]
    #[validate(url)]
    pub api_url: Option<String>,

    /// Bearer credential for the target API.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub model: Option<String>,

    /// Per-request completion token cap.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_tokens: Option<u32>,

    /// Requested concurrency; any JSON value is accepted.
    #[serde(default)]
    pub concurrency: ConcurrencyBudget,

    /// Consume responses as SSE streams.
    #[serde(default)]
    pub stream: Option<bool>,
}

impl JobRequest {
    /// Validate and convert into an immutable [`Job`].
    ///
    /// # Errors
    /// Returns [`BenchError::Validation`] for missing or malformed fields, an
    /// empty prompt list, or a prompt list longer than `limits.max_prompts`.
    pub fn into_job(self, limits: &JobLimits) -> BenchResult<Job> {
        if let Err(errors) = self.validate() {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|name| wire_name(name))
                .collect();
            fields.sort();
            return Err(BenchError::Validation {
                message: format!("Invalid fields: {}", fields.join(", ")),
                fields,
            });
        }

        // The repetition count is checked before the prompt list is built.
        let prompts = match (self.prompts, self.prompt) {
            (Some(prompts), _) if !prompts.is_empty() => {
                check_prompt_count(prompts.len(), limits, "prompts")?;
                prompts
            }
            (_, Some(prompt)) => {
                let count = self.num_requests.unwrap_or(1);
                check_prompt_count(count, limits, "numRequests")?;
                vec![prompt; count]
            }
            _ => Vec::new(),
        };

        let mut builder = Job::builder()
            .prompts(prompts)
            .max_tokens(self.max_tokens.unwrap_or(limits.default_max_tokens))
            .concurrency(self.concurrency)
            .streaming(self.stream.unwrap_or(limits.default_stream));

        if let Some(url) = self.api_url {
            builder = builder.base_url(url);
        }
        if let Some(key) = self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }

        builder.build()
    }
}

fn check_prompt_count(count: usize, limits: &JobLimits, field: &str) -> BenchResult<()> {
    if count > limits.max_prompts {
        return Err(BenchError::Validation {
            message: format!(
                "Job carries {count} prompts, the limit is {}",
                limits.max_prompts
            ),
            fields: vec![field.to_string()],
        });
    }
    Ok(())
}

/// Convert a snake_case struct field name to its camelCase wire name.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

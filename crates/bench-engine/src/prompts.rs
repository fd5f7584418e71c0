//! Generation of benchmark prompt lists through structured output.

use bench_client::{ChatRequest, Client, Message};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Upper bound on prompts per generation request.
pub const MAX_GENERATED_PROMPTS: usize = 500;

/// Name of the declared response schema.
const SCHEMA_NAME: &str = "benchmark_prompts";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid fence pattern"));

/// How strictly the generated output is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Validate against the declared schema; any deviation is an error.
    #[default]
    Strict,
    /// Repair what can be repaired and fall back to an unconstrained request.
    Lenient,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown generation mode '{other}'")),
        }
    }
}

/// Typed failures of [`PromptSchemaGenerator::generate`].
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Strict mode: the output did not match the declared schema.
    #[error("Schema validation failed: {}", diagnostics.join("; "))]
    SchemaValidationFailed {
        /// What was wrong with the output.
        diagnostics: Vec<String>,
    },

    /// Lenient mode: no attempt produced a usable prompt list.
    #[error("Prompt generation failed: {message}")]
    PromptGenerationFailed {
        /// Summary of every failed attempt.
        message: String,
    },

    /// Strict mode: the request itself failed.
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] bench_client::Error),
}

/// Declared shape of a generated prompt list:
/// `{ "prompts": [string, ...] }` with `1..=max_items` entries and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSpec {
    max_items: usize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct StrictPromptList {
    #[validate(length(min = 1, max = 500))]
    prompts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LenientPromptList {
    prompts: Vec<Value>,
}

impl SchemaSpec {
    /// Schema for `requested_count` prompts, bounded to `[1, 500]`.
    pub fn new(requested_count: usize) -> Self {
        Self {
            max_items: requested_count.clamp(1, MAX_GENERATED_PROMPTS),
        }
    }

    /// Maximum number of prompts accepted.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// JSON Schema document for the prompt list.
    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompts": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": self.max_items
                }
            },
            "required": ["prompts"],
            "additionalProperties": false
        })
    }

    /// `response_format` value requesting schema-constrained output.
    pub fn response_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": self.json_schema()
            }
        })
    }

    /// Validate generated content against the schema.
    ///
    /// # Errors
    /// Returns the list of diagnostics when the content does not conform.
    pub fn validate(&self, content: &str) -> Result<Vec<String>, Vec<String>> {
        let list: StrictPromptList =
            serde_json::from_str(content.trim()).map_err(|e| vec![format!("invalid document: {e}")])?;

        let mut diagnostics = Vec::new();
        if let Err(errors) = list.validate() {
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors {
                    diagnostics.push(format!("{field}: {}", error.code));
                }
            }
        }
        if list.prompts.len() > self.max_items {
            diagnostics.push(format!(
                "prompts: {} items, at most {} allowed",
                list.prompts.len(),
                self.max_items
            ));
        }

        if diagnostics.is_empty() {
            Ok(list.prompts)
        } else {
            Err(diagnostics)
        }
    }
}

/// Produces prompt lists for benchmark batches.
#[derive(Debug, Clone)]
pub struct PromptSchemaGenerator {
    client: Client,
    model: String,
}

impl PromptSchemaGenerator {
    /// Create a generator that asks `model` through `client`.
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate up to `count` prompts following `instructions`.
    ///
    /// # Errors
    /// Strict mode returns [`GenerationError::SchemaValidationFailed`] for
    /// non-conforming output and [`GenerationError::Upstream`] when the
    /// request fails. Lenient mode returns
    /// [`GenerationError::PromptGenerationFailed`] when every attempt failed.
    #[instrument(skip(self, instructions), fields(model = %self.model))]
    pub async fn generate(
        &self,
        instructions: &str,
        count: usize,
        mode: GenerationMode,
    ) -> Result<Vec<String>, GenerationError> {
        let schema = SchemaSpec::new(count);
        match mode {
            GenerationMode::Strict => self.generate_strict(instructions, &schema).await,
            GenerationMode::Lenient => self.generate_lenient(instructions, &schema).await,
        }
    }

    async fn generate_strict(
        &self,
        instructions: &str,
        schema: &SchemaSpec,
    ) -> Result<Vec<String>, GenerationError> {
        let content = self.complete(self.structured_request(instructions, schema)).await?;

        let prompts = schema
            .validate(&content)
            .map_err(|diagnostics| GenerationError::SchemaValidationFailed { diagnostics })?;

        info!(prompts = prompts.len(), "Generated prompt list");
        Ok(prompts)
    }

    async fn generate_lenient(
        &self,
        instructions: &str,
        schema: &SchemaSpec,
    ) -> Result<Vec<String>, GenerationError> {
        let mut failures = Vec::new();

        match self.complete(self.structured_request(instructions, schema)).await {
            Ok(content) => match parse_lenient(&content) {
                Some(prompts) => {
                    info!(prompts = prompts.len(), "Generated prompt list");
                    return Ok(prompts);
                }
                None => failures.push("structured response held no prompts array".to_string()),
            },
            Err(e) => failures.push(format!("structured request failed: {e}")),
        }

        warn!(reason = %failures[0], "Structured generation failed, retrying without schema");

        match self.complete(self.fallback_request(instructions, schema)).await {
            Ok(content) => match parse_lenient(&content) {
                Some(prompts) => {
                    info!(prompts = prompts.len(), "Generated prompt list from fallback request");
                    return Ok(prompts);
                }
                None => failures.push("fallback response held no prompts array".to_string()),
            },
            Err(e) => failures.push(format!("fallback request failed: {e}")),
        }

        Err(GenerationError::PromptGenerationFailed {
            message: failures.join("; "),
        })
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, bench_client::Error> {
        let response = self.client.chat_completion(&request).await?;
        Ok(response.content().to_string())
    }

    fn structured_request(&self, instructions: &str, schema: &SchemaSpec) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![
                Message::system(format!(
                    "You write prompts for benchmarking a language model. Produce at most {} \
                     distinct prompts that follow the user's instructions.",
                    schema.max_items()
                )),
                Message::user(instructions),
            ],
        )
        .with_response_format(schema.response_format())
    }

    fn fallback_request(&self, instructions: &str, schema: &SchemaSpec) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![
                Message::system(format!(
                    "You write prompts for benchmarking a language model. Reply with only a JSON \
                     object of the form {{\"prompts\": [\"...\"]}} holding at most {} prompts. \
                     No prose, no markdown.",
                    schema.max_items()
                )),
                Message::user(instructions),
            ],
        )
    }
}

/// Best-effort extraction of a prompt list.
///
/// Tries the content as-is, then the first fenced code block, then the span
/// between the outermost braces. String items are kept verbatim; any other
/// item is rendered as JSON text.
fn parse_lenient(content: &str) -> Option<Vec<String>> {
    let candidates = [
        Some(content.trim()),
        strip_code_fence(content),
        outer_object(content),
    ];

    candidates.into_iter().flatten().find_map(|candidate| {
        let list: LenientPromptList = match serde_json::from_str(candidate) {
            Ok(list) => list,
            Err(e) => {
                debug!(error = %e, "Candidate is not a prompt list");
                return None;
            }
        };
        let prompts: Vec<String> = list
            .prompts
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        (!prompts.is_empty()).then_some(prompts)
    })
}

fn strip_code_fence(content: &str) -> Option<&str> {
    CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn outer_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

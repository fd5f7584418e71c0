//! Response types for buffered chat completions.

use serde::{Deserialize, Serialize};

/// Response from a non-streaming chat completion request.
///
/// Only the fields the harness reads are required; compatible servers vary
/// in what else they send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique identifier for this completion.
    #[serde(default)]
    pub id: String,
    /// Model used for the completion.
    #[serde(default)]
    pub model: String,
    /// List of completion choices.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage statistics.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Get the content of the first choice, or `""`.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
    }

    /// Completion tokens reported by the server, or `0` when absent.
    pub fn completion_tokens(&self) -> u64 {
        self.usage.as_ref().map_or(0, |u| u64::from(u.completion_tokens))
    }
}

/// A single completion choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Index of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message.
    #[serde(default)]
    pub message: ChatMessage,
    /// Reason for completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A message in a chat response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    #[serde(default)]
    pub role: String,
    /// Content of the message; `null` for tool-only replies.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Number of tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total number of tokens.
    #[serde(default)]
    pub total_tokens: u32,
}

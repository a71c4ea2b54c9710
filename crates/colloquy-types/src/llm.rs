//! LLM request/response types for Colloquy.
//!
//! These types model the data exchanged with a completion provider:
//! the reduced role/content prompt form, the token usage breakdown, and
//! the archived response envelope stored on call records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A stored message reduced to the `{role, content}` pair providers accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Token usage reported by the provider for a single call.
///
/// `prompt_tokens` and `completion_tokens` are the two counts the core
/// accounts for; anything else the provider reports (totals, cache hits,
/// reasoning tokens) is captured verbatim in `extra` so the archived
/// envelope loses nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The archived envelope of one provider response.
///
/// Stored as the `response_data` payload on a completed call record.
/// `message` is the raw assistant-message object with its `role` and
/// `content` fields stripped -- the text is already persisted as a
/// regular assistant message, so duplicating it here would be waste.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    /// Provider-assigned response id.
    pub id: String,
    /// Model identifier the provider actually used.
    pub model: String,
    pub usage: TokenUsage,
    pub message: serde_json::Map<String, serde_json::Value>,
}

/// Extracted result of one completion call: the assistant text plus the
/// envelope to archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub data: ResponseData,
}

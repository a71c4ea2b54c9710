//! OpenAI-compatible chat completions wire types.
//!
//! These are provider-specific request/response structures for HTTP
//! communication with a `/chat/completions` endpoint. They are NOT the
//! generic LLM types from colloquy-types -- those are provider-agnostic.
//!
//! The choice message is deserialized as a raw JSON map rather than a
//! typed struct: the call record archives the assistant-message object
//! verbatim (minus role/content), so provider-specific fields must
//! survive untouched.

use serde::{Deserialize, Serialize};

use colloquy_types::llm::{PromptMessage, TokenUsage};

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [PromptMessage],
}

/// Response body of a non-streaming chat completion.
///
/// `usage` is mandatory here: a response without it cannot be accounted
/// for and is treated as malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: TokenUsage,
}

/// One choice in a chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: serde_json::Map<String, serde_json::Value>,
}

//! OpenAiCompatProvider -- concrete [`CompletionProvider`] over any
//! OpenAI-compatible chat completions endpoint (OpenAI itself, litellm,
//! OpenRouter, local gateways).
//!
//! Sends the reduced `{role, content}` message list to
//! `{base_url}/chat/completions` with bearer auth. The API key is wrapped
//! in [`secrecy::SecretString`] and is never logged or included in `Debug`
//! output.

mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use colloquy_core::llm::provider::CompletionProvider;
use colloquy_types::error::ProviderError;
use colloquy_types::llm::{Completion, PromptMessage, ResponseData};

use types::{ChatCompletionRequest, ChatCompletionResponse};

/// OpenAI-compatible completion provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing the Authorization header. It never appears in Debug
/// output, Display output, or tracing logs.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiCompatProvider {
    /// Create a new provider against the given base URL
    /// (e.g., "https://api.openai.com/v1").
    pub fn new(api_key: SecretString, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 min timeout for long generations
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Build the full completions URL.
    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Turn a raw HTTP response into a [`Completion`].
    ///
    /// Any non-2xx status becomes [`ProviderError::Status`] carrying the
    /// verbatim body, even when that body happens to parse as a completion.
    fn handle_response(status: u16, body: String) -> Result<Completion, ProviderError> {
        if !(200..300).contains(&status) {
            return Err(ProviderError::Status { status, body });
        }
        Self::parse_completion(&body)
    }

    /// Extract a [`Completion`] from a raw response body.
    ///
    /// Pulls the assistant text out of `choices[0].message.content`
    /// (absent/null content becomes empty text), then strips `role` and
    /// `content` from the message object before archiving it -- the text
    /// is persisted separately as a regular assistant message.
    fn parse_completion(body: &str) -> Result<Completion, ProviderError> {
        let response: ChatCompletionResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("empty choices".to_string()))?;

        let mut message = choice.message;
        message.remove("role");
        let text = match message.remove("content") {
            Some(serde_json::Value::String(text)) => text,
            _ => String::new(),
        };

        Ok(Completion {
            text,
            data: ResponseData {
                id: response.id,
                model: response.model,
                usage: response.usage,
                message,
            },
        })
    }
}

// OpenAiCompatProvider intentionally does NOT derive Debug to prevent
// accidental exposure of internal state.

impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> Result<Completion, ProviderError> {
        let body = ChatCompletionRequest { model, messages };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response body: {e}")))?;

        Self::handle_response(status, body)
    }
}

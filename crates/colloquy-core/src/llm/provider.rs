//! CompletionProvider trait definition.
//!
//! This is the abstraction the orchestrator invokes once per user turn.
//! A provider receives the ordered history reduced to `{role, content}`
//! pairs and returns the assistant text plus the response envelope to
//! archive on the call record.

use colloquy_types::error::ProviderError;
use colloquy_types::llm::{Completion, PromptMessage};

/// Trait for LLM completion backends (OpenAI-compatible gateways etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). A single
/// attempt is made per invocation; retry policy is out of scope.
///
/// Implementations live in colloquy-infra (e.g., `OpenAiCompatProvider`).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> impl std::future::Future<Output = Result<Completion, ProviderError>> + Send;
}

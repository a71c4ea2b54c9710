use thiserror::Error;

use uuid::Uuid;

/// Errors from store operations (used by trait definitions in colloquy-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the completion provider collaborator.
///
/// A single attempt is made per invocation; none of these are retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Errors surfaced by the conversation orchestrator.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The chat already has a system message; at most one is allowed.
    #[error("system message already exists")]
    DuplicateSystemMessage,

    #[error("chat '{0}' not found")]
    ChatNotFound(Uuid),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

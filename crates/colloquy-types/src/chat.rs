//! Chat, message, and call record types for Colloquy.
//!
//! These types model a conversation with an LLM backend: the chat session
//! with its cumulative token counters, the ordered message history, and one
//! audit record per provider invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::actor::ActorId;

// Re-export MessageRole from the llm module (it tags both stored messages
// and provider prompt messages).
pub use crate::llm::MessageRole;

use crate::llm::PromptMessage;

/// A conversation session.
///
/// Owns an ordered message history and a set of call records (both are
/// removed with the chat). The two token counters only ever grow; they are
/// incremented by the reported usage of each completed provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub input_tokens_total: u64,
    pub output_tokens_total: u64,
}

impl Chat {
    /// Create a new chat with zeroed counters.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            input_tokens_total: 0,
            output_tokens_total: 0,
        }
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

/// A single message within a chat.
///
/// Messages are immutable once created; `updated_at` exists for the
/// timestamp-touch convention but no edit operation is defined. Conversation
/// order is `created_at` ascending, with the time-sortable id as tiebreak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    /// Free-text body. Empty strings are permitted.
    pub body: String,
    /// The actor this message is attributed to.
    pub actor_id: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message in the given chat.
    pub fn new(chat_id: Uuid, role: MessageRole, body: impl Into<String>, actor_id: ActorId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            chat_id,
            role,
            body: body.into(),
            actor_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&Message> for PromptMessage {
    fn from(message: &Message) -> Self {
        PromptMessage {
            role: message.role.clone(),
            content: message.body.clone(),
        }
    }
}

/// Lifecycle status of a provider call record.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('new', 'generation_in_progress', 'generation_completed'))`
///
/// `GenerationInProgress` is part of the modeled lifecycle but the send
/// workflow never enters it; records go straight from `New` to
/// `GenerationCompleted` exactly once, or stay `New` when the provider
/// call fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    New,
    GenerationInProgress,
    GenerationCompleted,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::New => write!(f, "new"),
            CallStatus::GenerationInProgress => write!(f, "generation_in_progress"),
            CallStatus::GenerationCompleted => write!(f, "generation_completed"),
        }
    }
}

impl FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(CallStatus::New),
            "generation_in_progress" => Ok(CallStatus::GenerationInProgress),
            "generation_completed" => Ok(CallStatus::GenerationCompleted),
            other => Err(format!("invalid call status: '{other}'")),
        }
    }
}

impl Default for CallStatus {
    fn default() -> Self {
        CallStatus::New
    }
}

/// An audit record of one request/response cycle with the provider.
///
/// Created in `New` status before the provider is invoked; completed with
/// token counts and the response envelope in one atomic write. A record
/// left in `New` status marks a turn that was attempted but never finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub status: CallStatus,
    /// Archived provider response envelope; `None` until the call completes.
    pub response_data: Option<crate::llm::ResponseData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    /// Create a new call record in `New` status with zeroed counters.
    pub fn new(chat_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            chat_id,
            input_tokens: 0,
            output_tokens: 0,
            status: CallStatus::New,
            response_data: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The result of one completed send: the persisted user message, the
/// assistant reply, and the completed call record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub user: Message,
    pub assistant: Message,
    pub call: CallRecord,
}

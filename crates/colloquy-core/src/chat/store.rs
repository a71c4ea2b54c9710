//! ChatStore trait definition.
//!
//! Covers the whole conversation aggregate: chats with their token counters,
//! the ordered message history, and provider call records with their
//! message associations.

use colloquy_types::chat::{CallRecord, Chat, Message};
use colloquy_types::error::StoreError;
use colloquy_types::llm::ResponseData;
use uuid::Uuid;

/// Store trait for chat, message, and call record persistence.
///
/// Implementations live in colloquy-infra (e.g., `SqliteChatStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatStore: Send + Sync {
    /// Persist a new chat.
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get a chat by its unique ID.
    fn get_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, StoreError>> + Send;

    /// List chats, newest first.
    fn list_chats(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, StoreError>> + Send;

    /// Delete a chat along with its messages and call records.
    fn delete_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Add to the chat's cumulative token counters.
    ///
    /// The counters only ever grow; this is the sole mutation a chat row
    /// sees after creation. Also touches the chat's `updated_at`.
    fn add_chat_tokens(
        &self,
        chat_id: &Uuid,
        input_tokens: u64,
        output_tokens: u64,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Save a new message within a chat.
    fn save_message(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get messages for a chat, ordered by created_at ASC (id as tiebreak).
    fn get_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// Whether the chat already contains a `system`-role message.
    fn has_system_message(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Total number of messages in a chat.
    fn count_messages(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Persist a new call record (status `new`, zero counters).
    fn create_call(
        &self,
        call: &CallRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Associate messages with a call record in one batch write.
    ///
    /// An empty slice is a no-op. Re-associating an already-attached
    /// message is tolerated (the association is a set, not a list).
    fn attach_call_messages(
        &self,
        call_id: &Uuid,
        message_ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get a call record by its unique ID.
    fn get_call(
        &self,
        call_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<CallRecord>, StoreError>> + Send;

    /// IDs of the messages associated with a call record.
    fn get_call_message_ids(
        &self,
        call_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Uuid>, StoreError>> + Send;

    /// Complete a call record in one atomic write: set its token counters,
    /// store the response envelope, and transition status to
    /// `generation_completed`.
    fn complete_call(
        &self,
        call_id: &Uuid,
        input_tokens: u32,
        output_tokens: u32,
        response_data: &ResponseData,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// List call records, newest first, optionally filtered to one chat.
    fn list_calls(
        &self,
        chat_id: Option<&Uuid>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<CallRecord>, StoreError>> + Send;
}

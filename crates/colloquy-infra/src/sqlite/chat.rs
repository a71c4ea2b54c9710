//! SQLite chat store implementation.
//!
//! Implements `ChatStore` from `colloquy-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool, writes on the writer pool.

use colloquy_core::chat::store::ChatStore;
use colloquy_types::actor::ActorId;
use colloquy_types::chat::{CallRecord, CallStatus, Chat, Message, MessageRole};
use colloquy_types::error::StoreError;
use colloquy_types::llm::ResponseData;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatStore`.
#[derive(Clone)]
pub struct SqliteChatStore {
    pool: DatabasePool,
}

impl SqliteChatStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Chat.
struct ChatRow {
    id: String,
    created_at: String,
    updated_at: String,
    input_tokens_total: i64,
    output_tokens_total: i64,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            input_tokens_total: row.try_get("input_tokens_total")?,
            output_tokens_total: row.try_get("output_tokens_total")?,
        })
    }

    fn into_chat(self) -> Result<Chat, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid chat id: {e}")))?;
        Ok(Chat {
            id,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            input_tokens_total: self.input_tokens_total as u64,
            output_tokens_total: self.output_tokens_total as u64,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    body: String,
    actor_id: String,
    created_at: String,
    updated_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            body: row.try_get("body")?,
            actor_id: row.try_get("actor_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_message(self) -> Result<Message, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid message id: {e}")))?;
        let chat_id = Uuid::parse_str(&self.chat_id)
            .map_err(|e| StoreError::Query(format!("invalid chat_id: {e}")))?;
        let actor_id = Uuid::parse_str(&self.actor_id)
            .map_err(|e| StoreError::Query(format!("invalid actor_id: {e}")))?;
        let role: MessageRole = self.role.parse().map_err(StoreError::Query)?;

        Ok(Message {
            id,
            chat_id,
            role,
            body: self.body,
            actor_id: ActorId::from_uuid(actor_id),
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain CallRecord.
struct CallRow {
    id: String,
    chat_id: String,
    input_tokens: i64,
    output_tokens: i64,
    status: String,
    response_data: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CallRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            input_tokens: row.try_get("input_tokens")?,
            output_tokens: row.try_get("output_tokens")?,
            status: row.try_get("status")?,
            response_data: row.try_get("response_data")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_call(self) -> Result<CallRecord, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid call id: {e}")))?;
        let chat_id = Uuid::parse_str(&self.chat_id)
            .map_err(|e| StoreError::Query(format!("invalid chat_id: {e}")))?;
        let status: CallStatus = self.status.parse().map_err(StoreError::Query)?;
        let response_data: Option<ResponseData> = self
            .response_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| StoreError::Query(format!("invalid response_data: {e}")))?;

        Ok(CallRecord {
            id,
            chat_id,
            input_tokens: self.input_tokens as u32,
            output_tokens: self.output_tokens as u32,
            status,
            response_data,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ChatStore implementation
// ---------------------------------------------------------------------------

impl ChatStore for SqliteChatStore {
    async fn create_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO chats (id, created_at, updated_at, input_tokens_total, output_tokens_total)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(chat.id.to_string())
        .bind(format_datetime(&chat.created_at))
        .bind(format_datetime(&chat.updated_at))
        .bind(chat.input_tokens_total as i64)
        .bind(chat.output_tokens_total as i64)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn list_chats(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, StoreError> {
        let mut sql = String::from("SELECT * FROM chats ORDER BY created_at DESC, id DESC");

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_row =
                ChatRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            chats.push(chat_row.into_chat()?);
        }

        Ok(chats)
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn add_chat_tokens(
        &self,
        chat_id: &Uuid,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Result<(), StoreError> {
        // In-database increment: the single-connection writer pool is the
        // point of serialization for concurrent counter updates.
        let result = sqlx::query(
            r#"UPDATE chats
               SET input_tokens_total = input_tokens_total + ?,
                   output_tokens_total = output_tokens_total + ?,
                   updated_at = ?
               WHERE id = ?"#,
        )
        .bind(input_tokens as i64)
        .bind(output_tokens as i64)
        .bind(format_datetime(&Utc::now()))
        .bind(chat_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO messages (id, chat_id, role, body, actor_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.body)
        .bind(message.actor_id.to_string())
        .bind(format_datetime(&message.created_at))
        .bind(format_datetime(&message.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, StoreError> {
        // This ordering IS the conversation order. The id tiebreak keeps it
        // stable when wall-clock timestamps collide (ids are UUID v7, so the
        // tiebreak is itself time-sorted).
        let mut sql =
            String::from("SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC");

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let rows = sqlx::query(&sql)
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn has_system_message(&self, chat_id: &Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE chat_id = ? AND role = 'system') AS present",
        )
        .bind(chat_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let present: i64 = row
            .try_get("present")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(present != 0)
    }

    async fn count_messages(&self, chat_id: &Uuid) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM messages WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(count as u64)
    }

    async fn create_call(&self, call: &CallRecord) -> Result<(), StoreError> {
        let response_data = call
            .response_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Query(format!("unserializable response_data: {e}")))?;

        sqlx::query(
            r#"INSERT INTO llm_calls (id, chat_id, input_tokens, output_tokens, status, response_data, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(call.id.to_string())
        .bind(call.chat_id.to_string())
        .bind(call.input_tokens as i64)
        .bind(call.output_tokens as i64)
        .bind(call.status.to_string())
        .bind(response_data)
        .bind(format_datetime(&call.created_at))
        .bind(format_datetime(&call.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn attach_call_messages(
        &self,
        call_id: &Uuid,
        message_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        if message_ids.is_empty() {
            return Ok(());
        }

        // One multi-row INSERT instead of a write per message.
        let placeholders = vec!["(?, ?)"; message_ids.len()].join(", ");
        let sql = format!(
            "INSERT INTO llm_call_messages (call_id, message_id) VALUES {placeholders} \
             ON CONFLICT DO NOTHING"
        );

        let mut query = sqlx::query(&sql);
        for message_id in message_ids {
            query = query.bind(call_id.to_string()).bind(message_id.to_string());
        }

        query
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_call(&self, call_id: &Uuid) -> Result<Option<CallRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM llm_calls WHERE id = ?")
            .bind(call_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let call_row =
                    CallRow::from_row(&row).map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(call_row.into_call()?))
            }
            None => Ok(None),
        }
    }

    async fn get_call_message_ids(&self, call_id: &Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT message_id FROM llm_call_messages WHERE call_id = ? ORDER BY message_id ASC",
        )
        .bind(call_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("message_id")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let id = Uuid::parse_str(&raw)
                .map_err(|e| StoreError::Query(format!("invalid message_id: {e}")))?;
            ids.push(id);
        }

        Ok(ids)
    }

    async fn complete_call(
        &self,
        call_id: &Uuid,
        input_tokens: u32,
        output_tokens: u32,
        response_data: &ResponseData,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(response_data)
            .map_err(|e| StoreError::Query(format!("unserializable response_data: {e}")))?;

        // Counters, payload, and the status transition land in one UPDATE.
        let result = sqlx::query(
            r#"UPDATE llm_calls
               SET input_tokens = ?, output_tokens = ?, response_data = ?,
                   status = 'generation_completed', updated_at = ?
               WHERE id = ?"#,
        )
        .bind(input_tokens as i64)
        .bind(output_tokens as i64)
        .bind(payload)
        .bind(format_datetime(&Utc::now()))
        .bind(call_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn list_calls(
        &self,
        chat_id: Option<&Uuid>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CallRecord>, StoreError> {
        let mut sql = String::from("SELECT * FROM llm_calls");
        if chat_id.is_some() {
            sql.push_str(" WHERE chat_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(chat_id) = chat_id {
            query = query.bind(chat_id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut calls = Vec::with_capacity(rows.len());
        for row in &rows {
            let call_row =
                CallRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            calls.push(call_row.into_call()?);
        }

        Ok(calls)
    }
}

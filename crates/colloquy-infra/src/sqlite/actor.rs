//! SQLite actor store implementation.
//!
//! Implements `ActorStore` from `colloquy-core`. Resolution is idempotent
//! even under concurrent callers: the insert tolerates a handle conflict
//! and the follow-up SELECT returns whichever row won.

use colloquy_core::actor::ActorStore;
use colloquy_types::actor::{Actor, ActorId};
use colloquy_types::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ActorStore`.
#[derive(Clone)]
pub struct SqliteActorStore {
    pool: DatabasePool,
}

impl SqliteActorStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ActorRow {
    id: String,
    handle: String,
    created_at: String,
}

impl ActorRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            handle: row.try_get("handle")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_actor(self) -> Result<Actor, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid actor id: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))?;

        Ok(Actor {
            id: ActorId::from_uuid(id),
            handle: self.handle,
            created_at,
        })
    }
}

impl ActorStore for SqliteActorStore {
    async fn resolve_or_create(&self, handle: &str) -> Result<Actor, StoreError> {
        let candidate = Actor::new(handle);

        sqlx::query(
            "INSERT INTO actors (id, handle, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(handle) DO NOTHING",
        )
        .bind(candidate.id.to_string())
        .bind(&candidate.handle)
        .bind(candidate.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        // The winning row may be ours or a pre-existing one.
        let row = sqlx::query("SELECT * FROM actors WHERE handle = ?")
            .bind(handle)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        ActorRow::from_row(&row)
            .map_err(|e| StoreError::Query(e.to_string()))?
            .into_actor()
    }

    async fn get_actor(&self, actor_id: &ActorId) -> Result<Option<Actor>, StoreError> {
        let row = sqlx::query("SELECT * FROM actors WHERE id = ?")
            .bind(actor_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let actor_row =
                    ActorRow::from_row(&row).map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(actor_row.into_actor()?))
            }
            None => Ok(None),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Handle of the built-in actor credited with assistant messages.
pub const LLM_ACTOR_HANDLE: &str = "colloquy-llm";

/// Handle of the built-in fallback author for user messages.
pub const DEFAULT_USER_HANDLE: &str = "colloquy-user";

/// Unique identifier for an actor, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Create a new ActorId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create an ActorId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An identity that messages are attributed to.
///
/// Deliberately minimal: an actor is an opaque author reference with a
/// unique lookup handle, not a user account. The two built-in actors
/// ([`LLM_ACTOR_HANDLE`], [`DEFAULT_USER_HANDLE`]) are created lazily the
/// first time a message needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Unique handle used for lookup and display.
    pub handle: String,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    /// Create a new actor with the given handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            handle: handle.into(),
            created_at: Utc::now(),
        }
    }
}

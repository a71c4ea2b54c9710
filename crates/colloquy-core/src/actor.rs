//! ActorStore trait definition.
//!
//! Actors are opaque author identities looked up by a unique handle. The
//! two built-in actors (the LLM author and the default human author) are
//! resolved through [`ActorStore::resolve_or_create`], which must be
//! idempotent: a second resolution of the same handle finds the existing
//! actor rather than creating a duplicate.

use colloquy_types::actor::{Actor, ActorId};
use colloquy_types::error::StoreError;

/// Store trait for actor identity persistence.
///
/// Implementations live in colloquy-infra (e.g., `SqliteActorStore`).
pub trait ActorStore: Send + Sync {
    /// Find the actor with the given handle, creating it if absent.
    fn resolve_or_create(
        &self,
        handle: &str,
    ) -> impl std::future::Future<Output = Result<Actor, StoreError>> + Send;

    /// Get an actor by its unique ID.
    fn get_actor(
        &self,
        actor_id: &ActorId,
    ) -> impl std::future::Future<Output = Result<Option<Actor>, StoreError>> + Send;
}

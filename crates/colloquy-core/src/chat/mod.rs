//! Chat orchestration: the [`ChatStore`] port and the [`Conversation`]
//! orchestrator built on top of it.
//!
//! [`ChatStore`]: store::ChatStore
//! [`Conversation`]: conversation::Conversation

pub mod conversation;
pub mod store;

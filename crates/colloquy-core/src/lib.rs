//! Conversation orchestration and store trait definitions for Colloquy.
//!
//! This crate defines the "ports" (store and provider traits) that the
//! infrastructure layer implements. It depends only on `colloquy-types` --
//! never on `colloquy-infra` or any database/IO crate.

pub mod actor;
pub mod chat;
pub mod llm;

//! Shared domain types for Colloquy.
//!
//! This crate contains the core domain types used across Colloquy:
//! Chat, Message, CallRecord, Actor, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod actor;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;

//! Infrastructure layer for Colloquy.
//!
//! Contains implementations of the store and provider traits defined in
//! `colloquy-core`: SQLite storage, an OpenAI-compatible HTTP provider,
//! and the global config loader.

pub mod config;
pub mod llm;
pub mod sqlite;

//! Application state wiring the stores and provider together.
//!
//! The orchestrator is generic over store/provider traits; AppState pins
//! it to the concrete SQLite and HTTP implementations.

use std::path::PathBuf;

use anyhow::Context;
use secrecy::SecretString;

use colloquy_infra::config::{load_global_config, resolve_data_dir};
use colloquy_infra::llm::openai_compat::OpenAiCompatProvider;
use colloquy_infra::sqlite::actor::SqliteActorStore;
use colloquy_infra::sqlite::chat::SqliteChatStore;
use colloquy_infra::sqlite::pool::{database_url, DatabasePool};
use colloquy_types::config::GlobalConfig;

/// Shared application state for CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: resolve the data dir, connect to
    /// the database (running migrations), and load the config file.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let config = load_global_config(&data_dir).await;

        Ok(Self {
            config,
            data_dir,
            db_pool,
        })
    }

    /// Fresh chat store handle over the shared pool.
    pub fn chat_store(&self) -> SqliteChatStore {
        SqliteChatStore::new(self.db_pool.clone())
    }

    /// Fresh actor store handle over the shared pool.
    pub fn actor_store(&self) -> SqliteActorStore {
        SqliteActorStore::new(self.db_pool.clone())
    }

    /// Construct the completion provider from config.
    ///
    /// The API key is read from the configured environment variable and
    /// wrapped in a SecretString immediately.
    pub fn provider(&self) -> anyhow::Result<OpenAiCompatProvider> {
        let key_env = &self.config.provider.api_key_env;
        let api_key = std::env::var(key_env)
            .with_context(|| format!("API key environment variable '{key_env}' is not set"))?;

        Ok(OpenAiCompatProvider::new(
            SecretString::from(api_key),
            self.config.provider.base_url.clone(),
        ))
    }
}

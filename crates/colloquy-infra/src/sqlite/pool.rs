//! SQLite connection pools for the chat database.
//!
//! Chat history reads (listing, history rendering) happen far more often than
//! writes, and SQLite permits only one writer at a time. `DatabasePool` keeps
//! a multi-connection reader pool next to a single-connection writer pool so
//! reads never queue behind a turn being persisted.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Paired reader/writer pools over one SQLite file.
///
/// `reader` serves SELECTs (up to 8 connections); `writer` is a single
/// connection so INSERT/UPDATE/DELETE serialize without busy errors.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

/// SQLite URL for the chat database inside `data_dir`.
///
/// `mode=rwc` so first launch creates the file.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("colloquy.db").display())
}

impl DatabasePool {
    /// Open both pools against `database_url` and run pending migrations.
    ///
    /// Migrations run on the writer before the read-only pool opens, so the
    /// reader never sees a half-migrated schema. WAL journal mode, foreign
    /// key enforcement, and a 5s busy timeout apply to every connection.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Run migrations on writer before opening reader pool
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

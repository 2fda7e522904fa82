//! SQLite persistence for installations, credentials, handshakes, and
//! subscriptions.
//!
//! All state lives in one database file opened in WAL mode. Schema creation
//! is idempotent and runs on every open, so there is no separate migration
//! step for a single-process deployment.

pub mod credentials;
pub mod models;
pub mod subscriptions;

pub use models::{Credential, Handshake, Installation, Subscription};

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to open database: {0}")]
    Open(#[source] sqlx::Error),

    #[error("failed to apply schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Handle to the bot's SQLite database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DatabaseError::Open)?;

        let db = Database { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Opens a fresh in-memory database. Used by tests.
    ///
    /// A single connection is required: every pool connection would otherwise
    /// get its own empty in-memory database.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(DatabaseError::Open)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DatabaseError::Open)?;

        let db = Database { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let ddl = [
            "CREATE TABLE IF NOT EXISTS installations (
                installation_id INTEGER PRIMARY KEY,
                account_login   TEXT NOT NULL,
                account_id      INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS credentials (
                chat_user_id      INTEGER PRIMARY KEY,
                provider_user_id  TEXT NOT NULL,
                provider_username TEXT NOT NULL,
                access_token      TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS handshakes (
                token        TEXT PRIMARY KEY,
                chat_user_id INTEGER NOT NULL,
                expires_at   INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS subscriptions (
                chat_id      INTEGER NOT NULL,
                chat_kind    TEXT NOT NULL,
                owner        TEXT NOT NULL,
                repo         TEXT NOT NULL,
                wants_commit INTEGER NOT NULL,
                wants_issue  INTEGER NOT NULL,
                wants_pr     INTEGER NOT NULL,
                created_by   INTEGER NOT NULL,
                PRIMARY KEY (chat_id, owner, repo)
            )",
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_repo
                ON subscriptions (owner, repo)",
        ];

        for statement in ddl {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::Schema)?;
        }
        Ok(())
    }
}

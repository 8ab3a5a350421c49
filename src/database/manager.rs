use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const CREATE_TODOS: &str = r#"
    CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        userId TEXT NOT NULL,
        title TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0
    )
"#;

const CREATE_TODOS_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS todos_user_id_idx ON todos (userId)";

/// Builds and prepares the connection pool handed to the store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool using the configured URL, size and acquire timeout
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        if config.url.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;

        info!("Created database pool for: {}", config.url);
        Ok(pool)
    }

    /// Single-connection in-memory database. The connection never expires,
    /// so the data lives as long as the pool.
    pub async fn in_memory() -> Result<SqlitePool, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(pool)
    }

    /// Create the schema if it does not exist yet
    pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
        for statement in [CREATE_TODOS, CREATE_TODOS_USER_INDEX] {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

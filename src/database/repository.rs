use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::models::todo::{check_title, completed_flag, Todo, TodoChanges, TodoRow};

const TODO_COLUMNS: &str = "id, userId, title, completed";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other),
        }
    }
}

/// Todo persistence scoped to an owning subject.
///
/// Every operation takes the owner first and only ever touches rows whose
/// `userId` equals it. A record owned by someone else behaves exactly like a
/// record that does not exist.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All todos of `owner`, in no particular order
    async fn list(&self, owner: &str) -> Result<Vec<Todo>, StoreError>;

    async fn get(&self, owner: &str, id: i64) -> Result<Option<Todo>, StoreError>;

    /// Insert a new, not yet completed todo
    async fn create(&self, owner: &str, title: &str) -> Result<Todo, StoreError>;

    /// Apply the present fields of `changes`; absent fields keep their value
    async fn update(
        &self,
        owner: &str,
        id: i64,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;

    /// Hard delete. Missing or foreign ids are a no-op.
    async fn delete(&self, owner: &str, id: i64) -> Result<(), StoreError>;
}

/// SQLite-backed store. Each call is a single statement.
#[derive(Clone)]
pub struct SqliteTodoStore {
    pool: SqlitePool,
}

impl SqliteTodoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    check_title(title).map_err(|message| StoreError::Validation {
        field: "title",
        message,
    })
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn list(&self, owner: &str) -> Result<Vec<Todo>, StoreError> {
        let sql = format!("SELECT {} FROM todos WHERE userId = ?", TODO_COLUMNS);
        let rows = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn get(&self, owner: &str, id: i64) -> Result<Option<Todo>, StoreError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE userId = ? AND id = ?",
            TODO_COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(owner)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Todo::from))
    }

    async fn create(&self, owner: &str, title: &str) -> Result<Todo, StoreError> {
        validate_title(title)?;

        let sql = format!(
            "INSERT INTO todos (userId, title, completed) VALUES (?, ?, ?) RETURNING {}",
            TODO_COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(owner)
            .bind(title)
            .bind(completed_flag(false))
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Created todo {} for {}", row.id, owner);
        Ok(row.into())
    }

    async fn update(
        &self,
        owner: &str,
        id: i64,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        if let Some(title) = changes.title.as_deref() {
            validate_title(title)?;
        }

        let sql = format!(
            "UPDATE todos SET title = COALESCE(?, title), completed = COALESCE(?, completed) \
             WHERE userId = ? AND id = ? RETURNING {}",
            TODO_COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(changes.title)
            .bind(changes.completed.map(completed_flag))
            .bind(owner)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Todo::from))
    }

    async fn delete(&self, owner: &str, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE userId = ? AND id = ?")
            .bind(owner)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Delete of todo {} by {} matched nothing", id, owner);
        }
        Ok(())
    }
}

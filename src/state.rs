use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::database::{SqliteTodoStore, TodoStore};
use crate::llm::LanguageModel;

/// Handles shared by every request. Constructed once at startup and passed
/// to the router; nothing in here is mutated by handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn TodoStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub llm: Arc<dyn LanguageModel>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        verifier: Arc<dyn IdentityVerifier>,
        llm: Arc<dyn LanguageModel>,
        config: AppConfig,
    ) -> Self {
        Self {
            store: Arc::new(SqliteTodoStore::new(db.clone())),
            db,
            verifier,
            llm,
            config: Arc::new(config),
        }
    }
}

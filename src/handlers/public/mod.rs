// handlers/public/mod.rs - no authentication

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Todo Chat API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "todos": "/api/todos[/:id] (protected)",
            "chat": "/api/chat (protected)",
            "nft": "/api/nft (protected)",
            "health": "/health (public)",
        }
    }))
}

/// GET /health - liveness plus database reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

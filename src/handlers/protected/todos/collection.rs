use axum::{
    extract::{Extension, State},
    Json,
};

use crate::api::{CreateTodoRequest, ValidJson};
use crate::database::Todo;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/todos - every todo owned by the caller
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.store.list(&user.sub).await?;
    Ok(Json(todos))
}

/// POST /api/todos - create a todo owned by the caller
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(title): ValidJson<CreateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state.store.create(&user.sub, &title).await?;
    tracing::info!("Todo {} created by {}", todo.id, user.sub);
    Ok(Json(todo))
}

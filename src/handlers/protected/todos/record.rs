use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{TodoId, UpdateTodoRequest, ValidJson};
use crate::database::Todo;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

// Missing and foreign ids both answer 200 with a `null` body; existing
// clients depend on that instead of a 404.

/// GET /api/todos/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    TodoId(id): TodoId,
) -> Result<Json<Option<Todo>>, ApiError> {
    let todo = state.store.get(&user.sub, id).await?;
    Ok(Json(todo))
}

/// PUT /api/todos/:id - partial update; omitted fields are left alone
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    TodoId(id): TodoId,
    ValidJson(changes): ValidJson<UpdateTodoRequest>,
) -> Result<Json<Option<Todo>>, ApiError> {
    let todo = state.store.update(&user.sub, id, changes).await?;
    Ok(Json(todo))
}

/// DELETE /api/todos/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    TodoId(id): TodoId,
) -> Result<Json<Value>, ApiError> {
    state.store.delete(&user.sub, id).await?;
    Ok(Json(json!({ "success": true })))
}

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use super::requests::Validate;
use crate::error::ApiError;

/// JSON body deserialized into `T` and validated. Holds the validated output.
pub struct ValidJson<T: Validate>(pub T::Output);

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::validation_error(e.body_text(), None),
        other => ApiError::invalid_json(other.body_text()),
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(ValidJson(body.validate()?))
    }
}

/// Positive integer `:id` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoId(pub i64);

impl TodoId {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(TodoId(id)),
            _ => Err(ApiError::field_error("id", "must be a positive integer")),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TodoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        TodoId::parse(&raw)
    }
}

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal, injected into request extensions by the gate
#[derive(Clone, Debug)]
pub struct AuthUser {
    /// Subject identifier; the owner id for every store call
    pub sub: String,
    pub email: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
        }
    }
}

/// Bearer token gate. Requests that fail here never reach a handler.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .map_err(|_| ApiError::unauthorized("Authorization header is required"))?;

    let claims = state.verifier.verify(&token).await.map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        ApiError::unauthorized("Invalid token")
    })?;

    let auth_user = AuthUser::from(claims);
    tracing::debug!("Authenticated subject {}", auth_user.sub);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = auth_str
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token.to_string())
}

use axum::{
    extract::{Extension, State},
    http::{header::CONTENT_TYPE, HeaderName},
    response::{IntoResponse, Response},
};

use crate::api::{ChatRequest, ValidJson};
use crate::error::ApiError;
use crate::llm::stream::{data_stream_body, forward_detached};
use crate::llm::TextRequest;
use crate::middleware::AuthUser;
use crate::state::AppState;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// POST /api/chat - stream the assistant's reply to the conversation
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(messages): ValidJson<ChatRequest>,
) -> Result<Response, ApiError> {
    let request = TextRequest {
        model: state.config.llm.chat_model.clone(),
        system: Some(SYSTEM_PROMPT.to_string()),
        messages,
    };

    let upstream = state.llm.stream_text(request).await?;

    let sub = user.sub;
    let deltas = forward_detached(upstream, move |reply| {
        tracing::info!("Chat reply for {} finished ({} chars)", sub, reply.chars().count());
    });

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (HeaderName::from_static("x-vercel-ai-data-stream"), "v1"),
        ],
        data_stream_body(deltas),
    )
        .into_response())
}

use axum::{
    extract::{Extension, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};

use crate::api::{NftRequest, ValidJson};
use crate::error::ApiError;
use crate::llm::stream::{forward_detached, text_stream_body};
use crate::llm::ObjectRequest;
use crate::middleware::AuthUser;
use crate::nft;
use crate::state::AppState;

/// POST /api/nft - stream NFT metadata JSON generated from free-text context
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(context): ValidJson<NftRequest>,
) -> Result<Response, ApiError> {
    let request = ObjectRequest {
        model: state.config.llm.nft_model.clone(),
        schema_name: nft::SCHEMA_NAME.to_string(),
        schema: nft::schema(),
        prompt: nft::prompt(&context),
    };

    let upstream = state.llm.stream_object(request).await?;

    // The bytes are already on their way to the client; a bad object can
    // only be reported.
    let sub = user.sub;
    let deltas = forward_detached(upstream, move |text| match nft::check_generated(&text) {
        Ok(metadata) => tracing::info!("NFT metadata '{}' generated for {}", metadata.name, sub),
        Err(problems) => tracing::warn!(
            "Generated NFT metadata for {} violates the schema: {}",
            sub,
            problems.join("; ")
        ),
    });

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        text_stream_body(deltas),
    )
        .into_response())
}

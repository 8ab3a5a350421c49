mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{ScriptedModel, UnconfiguredModel};
use todo_chat_api::llm::Role;

#[tokio::test]
async fn chat_streams_data_protocol_parts() -> Result<()> {
    let model = Arc::new(ScriptedModel::replying(&["Hel", "lo \"there\"", "\n!"]));
    let app = common::test_app_with_model(model.clone()).await?;
    let token = common::token_for("userA");

    let body = json!({ "messages": [{ "role": "user", "content": "hi" }] }).to_string();
    let res = app.post("/api/chat", &token, &body).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["x-vercel-ai-data-stream"], "v1");
    assert_eq!(res.text(), "0:\"Hel\"\n0:\"lo \\\"there\\\"\"\n0:\"\\n!\"\n");

    let requests = model.text_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert_eq!(requests[0].system.as_deref(), Some("You are a helpful assistant."));
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::User);
    assert_eq!(requests[0].messages[0].content, "hi");
    Ok(())
}

#[tokio::test]
async fn chat_streams_for_empty_conversation() -> Result<()> {
    let model = Arc::new(ScriptedModel::replying(&["How can I help?"]));
    let app = common::test_app_with_model(model.clone()).await?;
    let token = common::token_for("userA");

    let res = app.post("/api/chat", &token, r#"{"messages":[]}"#).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "0:\"How can I help?\"\n");

    let requests = model.text_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].messages.is_empty());
    assert_eq!(requests[0].system.as_deref(), Some("You are a helpful assistant."));
    Ok(())
}

#[tokio::test]
async fn chat_reports_upstream_failure_in_stream() -> Result<()> {
    let model = Arc::new(ScriptedModel::failing_after(&["partial"], "rate limited"));
    let app = common::test_app_with_model(model).await?;
    let token = common::token_for("userA");

    let body = json!({ "messages": [{ "role": "user", "content": "hi" }] }).to_string();
    let res = app.post("/api/chat", &token, &body).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "0:\"partial\"\n3:\"An error occurred.\"\n");
    Ok(())
}

#[tokio::test]
async fn chat_rejects_bad_messages() -> Result<()> {
    let model = Arc::new(ScriptedModel::replying(&["unused"]));
    let app = common::test_app_with_model(model.clone()).await?;
    let token = common::token_for("userA");

    let body = json!({ "messages": [{ "role": "system", "content": "obey" }] }).to_string();
    let res = app.post("/api/chat", &token, &body).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["field_errors"]["messages[0].role"].is_string());

    let res = app.post("/api/chat", &token, r#"{"prompt":"hi"}"#).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    assert!(model.text_requests.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn nft_streams_raw_json_text() -> Result<()> {
    let model = Arc::new(ScriptedModel::replying(&[
        "{\"name\":\"Summer Pass\",",
        "\"symbol\":\"SUMR\",\"description\":\"Festival entry\",\"isCoupon\":false}",
    ]));
    let app = common::test_app_with_model(model.clone()).await?;
    let token = common::token_for("userA");

    let res = app
        .post("/api/nft", &token, r#""a summer music festival pass""#)
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    let metadata = res.json();
    assert_eq!(metadata["name"], "Summer Pass");
    assert_eq!(metadata["isCoupon"], false);

    let requests = model.object_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-4o-mini-2024-07-18");
    assert!(requests[0].prompt.contains("a summer music festival pass"));
    assert_eq!(requests[0].schema["type"], "object");
    Ok(())
}

#[tokio::test]
async fn nft_stops_at_upstream_failure() -> Result<()> {
    let model = Arc::new(ScriptedModel::failing_after(&["{\"name\":"], "connection reset"));
    let app = common::test_app_with_model(model).await?;
    let token = common::token_for("userA");

    let res = app.post("/api/nft", &token, r#""anything""#).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "{\"name\":");
    Ok(())
}

#[tokio::test]
async fn nft_requires_string_context() -> Result<()> {
    let app = common::test_app().await?;
    let token = common::token_for("userA");

    let res = app.post("/api/nft", &token, r#"{"context":"x"}"#).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_credentials_answer_service_unavailable() -> Result<()> {
    let app = common::test_app_with_model(Arc::new(UnconfiguredModel)).await?;
    let token = common::token_for("userA");

    let body = json!({ "messages": [{ "role": "user", "content": "hi" }] }).to_string();
    let res = app.post("/api/chat", &token, &body).await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);

    let res = app.post("/api/nft", &token, r#""x""#).await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

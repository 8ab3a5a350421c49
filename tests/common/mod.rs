#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::stream;
use serde_json::Value;
use tower::ServiceExt;

use todo_chat_api::auth::HmacVerifier;
use todo_chat_api::config::AppConfig;
use todo_chat_api::database::DatabaseManager;
use todo_chat_api::llm::{LanguageModel, LlmError, ObjectRequest, TextRequest, TextStream};
use todo_chat_api::state::AppState;

pub const SECRET: &str = "integration-secret";

/// Language model double that replays fixed deltas and records what it was asked
#[derive(Default)]
pub struct ScriptedModel {
    pub deltas: Vec<String>,
    pub fail_after: Option<String>,
    pub text_requests: Mutex<Vec<TextRequest>>,
    pub object_requests: Mutex<Vec<ObjectRequest>>,
}

impl ScriptedModel {
    pub fn replying(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_after(deltas: &[&str], message: &str) -> Self {
        Self {
            fail_after: Some(message.to_string()),
            ..Self::replying(deltas)
        }
    }

    fn script(&self) -> TextStream {
        let mut items: Vec<Result<String, LlmError>> =
            self.deltas.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_after {
            items.push(Err(LlmError::Provider(message.clone())));
        }
        Box::pin(stream::iter(items))
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, LlmError> {
        self.text_requests.lock().unwrap().push(request);
        Ok(self.script())
    }

    async fn stream_object(&self, request: ObjectRequest) -> Result<TextStream, LlmError> {
        self.object_requests.lock().unwrap().push(request);
        Ok(self.script())
    }
}

/// Model double with no credentials
pub struct UnconfiguredModel;

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn stream_text(&self, _request: TextRequest) -> Result<TextStream, LlmError> {
        Err(LlmError::NotConfigured)
    }

    async fn stream_object(&self, _request: ObjectRequest) -> Result<TextStream, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn test_app() -> Result<TestApp> {
    test_app_with_model(Arc::new(ScriptedModel::default())).await
}

pub async fn test_app_with_model(llm: Arc<dyn LanguageModel>) -> Result<TestApp> {
    let pool = DatabaseManager::in_memory().await?;
    DatabaseManager::migrate(&pool).await?;

    let verifier = Arc::new(HmacVerifier::new(SECRET, None));
    let state = AppState::new(pool, verifier, llm, AppConfig::development());
    let router = todo_chat_api::app(state.clone());

    Ok(TestApp { router, state })
}

/// Bearer token for `sub`, valid for ten minutes
pub fn token_for(sub: &str) -> String {
    HmacVerifier::new(SECRET, None)
        .issue(sub, chrono::Duration::minutes(10))
        .expect("failed to sign test token")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is not UTF-8")
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: &str) -> Result<TestResponse> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: &str) -> Result<TestResponse> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

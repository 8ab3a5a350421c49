use async_trait::async_trait;
use axum::body::Bytes;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::pin::Pin;

use super::sse::{parse_completion_event, CompletionEvent, SseDecoder};
use super::{ChatMessage, LanguageModel, LlmError, ObjectRequest, Role, TextRequest, TextStream};
use crate::config::LlmConfig;

/// Chat-completions client for OpenAI-compatible endpoints
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn start(&self, body: Value) -> Result<TextStream, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Streaming completion from {}", body["model"]);
        Ok(delta_stream(response.bytes_stream()))
    }
}

fn text_body(request: &TextRequest) -> Value {
    let mut messages: Vec<ChatMessage> = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage::new(Role::System, system.clone()));
    }
    messages.extend(request.messages.iter().cloned());

    json!({
        "model": request.model,
        "stream": true,
        "messages": messages,
    })
}

fn object_body(request: &ObjectRequest) -> Value {
    json!({
        "model": request.model,
        "stream": true,
        "messages": [ChatMessage::new(Role::User, request.prompt.clone())],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": request.schema_name,
                "schema": request.schema,
            }
        }
    })
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, LlmError> {
        self.start(text_body(&request)).await
    }

    async fn stream_object(&self, request: ObjectRequest) -> Result<TextStream, LlmError> {
        self.start(object_body(&request)).await
    }
}

struct DeltaState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

impl<S> DeltaState<S> {
    /// Queue the outcome of one event
    fn accept(&mut self, data: &str) {
        match parse_completion_event(data) {
            Ok(Some(CompletionEvent::Delta(text))) => self.pending.push_back(Ok(text)),
            Ok(Some(CompletionEvent::Done)) => self.finished = true,
            Ok(None) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

/// Turn a raw SSE byte stream into content deltas. Stops after `[DONE]` or
/// the first error.
pub fn delta_stream<S, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let state = DeltaState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.push(&chunk) {
                        if state.finished {
                            break;
                        }
                        state.accept(&data);
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e.into()));
                    state.finished = true;
                }
                None => {
                    if let Some(data) = state.decoder.finish() {
                        state.accept(&data);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

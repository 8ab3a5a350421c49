//! Hosted language model access.
//!
//! Routes depend on [`LanguageModel`]; [`openai::OpenAiClient`] is the
//! production implementation.

pub mod openai;
pub mod sse;
pub mod stream;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model API key is not configured")]
    NotConfigured,

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed stream event: {0}")]
    Decode(String),

    #[error("provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Free-form completion over a conversation
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Completion constrained to a JSON schema
#[derive(Debug, Clone)]
pub struct ObjectRequest {
    pub model: String,
    pub schema_name: String,
    pub schema: Value,
    pub prompt: String,
}

/// Text deltas in arrival order
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start a streamed chat completion. Errors returned here happen before
    /// any output; later failures arrive inside the stream.
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, LlmError>;

    /// Start a streamed structured completion. The stream carries the JSON
    /// document as text, piece by piece.
    async fn stream_object(&self, request: ObjectRequest) -> Result<TextStream, LlmError>;
}

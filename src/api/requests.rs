// Typed request contracts. Each body shape deserializes leniently and is then
// checked by `validate`, which yields the value handlers work with.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::database::models::todo::check_title;
use crate::database::TodoChanges;
use crate::error::ApiError;
use crate::llm::{ChatMessage, Role};

pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ApiError>;
}

fn fail(field_errors: BTreeMap<String, String>) -> ApiError {
    ApiError::validation_error("Invalid request", Some(field_errors))
}

/// POST /api/todos
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

impl Validate for CreateTodoRequest {
    type Output = String;

    fn validate(self) -> Result<String, ApiError> {
        check_title(&self.title).map_err(|msg| ApiError::field_error("title", msg))?;
        Ok(self.title)
    }
}

/// PUT /api/todos/:id
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl Validate for UpdateTodoRequest {
    type Output = TodoChanges;

    fn validate(self) -> Result<TodoChanges, ApiError> {
        if let Some(title) = &self.title {
            check_title(title).map_err(|msg| ApiError::field_error("title", msg))?;
        }
        Ok(TodoChanges {
            title: self.title,
            completed: self.completed,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageInput {
    pub role: String,
    pub content: String,
}

/// POST /api/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessageInput>,
}

impl Validate for ChatRequest {
    type Output = Vec<ChatMessage>;

    fn validate(self) -> Result<Vec<ChatMessage>, ApiError> {
        let mut errors = BTreeMap::new();
        let mut messages = Vec::with_capacity(self.messages.len());

        for (i, message) in self.messages.into_iter().enumerate() {
            let role = match message.role.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                other => {
                    errors.insert(
                        format!("messages[{}].role", i),
                        format!("expected 'user' or 'assistant', got '{}'", other),
                    );
                    continue;
                }
            };
            messages.push(ChatMessage::new(role, message.content));
        }

        if errors.is_empty() {
            Ok(messages)
        } else {
            Err(fail(errors))
        }
    }
}

/// POST /api/nft: the body is a bare JSON string of free-text context
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct NftRequest {
    pub context: String,
}

impl Validate for NftRequest {
    type Output = String;

    fn validate(self) -> Result<String, ApiError> {
        Ok(self.context)
    }
}

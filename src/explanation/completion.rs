use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Chat-completion response body; only the fields the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl CompletionResponse {
    /// Response carrying a single assistant message; handy for fakes.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![CompletionChoice {
                message: CompletionMessage {
                    role: Some("assistant".into()),
                    content: text.into(),
                },
            }],
        }
    }

    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }
}

/// Failures from a completion backend, classified by HTTP status where one exists.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompletionError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Map a non-success HTTP status and the provider's error text.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => CompletionError::Auth(if message.is_empty() {
                "check that the API key is correct and not expired".into()
            } else {
                message
            }),
            403 => CompletionError::Forbidden(if message.is_empty() {
                "the API key does not have permission to use this model".into()
            } else {
                message
            }),
            status => CompletionError::Api { status, message },
        }
    }
}

/// Anything that can turn a prompt into a chat completion.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, CompletionError>;
}

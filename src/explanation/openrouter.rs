use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::completion::{CompletionError, CompletionOptions, CompletionResponse, Completer};
use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2:free";
const APP_TITLE: &str = "Word Tracker";

/// Model id fragments listed ahead of everything else in the model picker.
pub const RECOMMENDED_MODELS: [&str; 3] = ["qwen3-235b-a22b-2507", "deepseek-chat-v3-0324", "kimi-k2"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub created: i64,
}

impl ModelInfo {
    pub fn is_recommended(&self) -> bool {
        RECOMMENDED_MODELS
            .iter()
            .any(|fragment| self.id.contains(fragment))
    }
}

/// Recommended models first, then newest first.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| {
        b.is_recommended()
            .cmp(&a.is_recommended())
            .then_with(|| b.created.cmp(&a.created))
    });
}

pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(anyhow!("OpenRouter API key is required"));
        }
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model.trim()
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Client::builder()
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("X-Title", APP_TITLE)
    }

    /// All models the provider currently offers, unsorted.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, CompletionError> {
        let endpoint = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(endpoint))
            .send()
            .await
            .map_err(|err| CompletionError::Network(err.to_string()))?;

        let body = read_success_body(response).await?;
        let parsed: ModelList = serde_json::from_str(&body)
            .map_err(|err| CompletionError::InvalidResponse(err.to_string()))?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl Completer for OpenRouterClient {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, CompletionError> {
        if prompt.trim().is_empty() {
            return Err(CompletionError::InvalidRequest("prompt is required".into()));
        }

        let endpoint = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        log_debug!("Requesting completion from {} with model {}", endpoint, self.model);

        let response = self
            .authorized(self.client.post(endpoint))
            .json(&payload)
            .send()
            .await
            .map_err(|err| CompletionError::Network(err.to_string()))?;

        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|err| CompletionError::InvalidResponse(err.to_string()))
    }
}

async fn read_success_body(response: Response) -> Result<String, CompletionError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| CompletionError::Network(err.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| {
            let reason = status.canonical_reason().unwrap_or_default();
            format!("{reason} {}", body.trim()).trim().to_string()
        });
    Err(CompletionError::from_status(status.as_u16(), message))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

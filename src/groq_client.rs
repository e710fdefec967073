use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat call. Unset sampling fields fall back to the client defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Result returned to callers and by `POST /api/groq/*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: Option<ApiChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

/// Client for the Groq chat-completions API (OpenAI-compatible).
#[derive(Clone)]
pub struct GroqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl GroqClient {
    /// Creates a new `GroqClient`.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Groq API key, sent as a Bearer token.
    /// * `base_url` - API root, e.g. `https://api.groq.com/openai/v1`.
    /// * `default_model` - Model used when a request does not name one.
    pub fn new(api_key: String, base_url: String, default_model: String) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::InternalError(
                "GROQ_API_KEY não configurada no ambiente".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Groq client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
        })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Sends a chat completion request.
    ///
    /// Any transport failure, non-2xx status or unreadable body is returned
    /// as `ExternalApiError` prefixed with "Erro ao chamar Groq API". A single
    /// attempt is made.
    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletion, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = request
            .model
            .unwrap_or_else(|| self.default_model.clone());
        let temperature = request.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        tracing::debug!(
            "Calling Groq: model={}, temperature={}, max_tokens={}, messages={}",
            model,
            temperature,
            max_tokens,
            request.messages.len()
        );

        let body = json!({
            "messages": request.messages,
            "model": model,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Groq returned error {}: {}", status, error_text);
            return Err(upstream_error(format!("{}: {}", status, error_text)));
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| upstream_error(format!("failed to parse response: {}", e)))?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            model: data.model,
            usage: data.usage,
        })
    }

    /// Single user prompt with default sampling.
    pub async fn simple_completion(
        &self,
        prompt: &str,
        model: Option<String>,
    ) -> Result<ChatCompletion, AppError> {
        self.chat_completion(ChatCompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            model,
            ..Default::default()
        })
        .await
    }
}

fn upstream_error(detail: String) -> AppError {
    AppError::ExternalApiError(format!("Erro ao chamar Groq API: {}", detail))
}

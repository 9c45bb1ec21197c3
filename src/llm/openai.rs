//! OpenAI API client with automatic retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ApiMode, ChatMessage, CompletionOptions, LlmClient};
use crate::retry::{parse_retry_after, with_retry, ProviderError, RetryPolicy};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI client serving both chat and legacy completion models.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENAI_API_BASE)
    }

    /// Create a client against a compatible endpoint (proxies, mock servers).
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// POST a JSON body and return the raw response text on success.
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), text, retry_after));
        }

        Ok(text)
    }

    async fn chat_request(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ProviderError::parse_error(format!("Failed to encode request: {}", e)))?;
        let text = self.post("/chat/completions", &body).await?;

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::parse_error(format!("Failed to parse response: {}, body: {}", e, text))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| ProviderError::parse_error("No choices in response".to_string()))
    }

    async fn completion_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ProviderError::parse_error(format!("Failed to encode request: {}", e)))?;
        let text = self.post("/completions", &body).await?;

        let parsed: CompletionResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::parse_error(format!("Failed to parse response: {}, body: {}", e, text))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .ok_or_else(|| ProviderError::parse_error("No choices in response".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> anyhow::Result<String> {
        tracing::debug!(
            "Sending completion request: model={}, max_tokens={}",
            model,
            options.max_tokens
        );

        match ApiMode::for_model(model) {
            ApiMode::Chat => {
                let request = ChatRequest {
                    model: model.to_string(),
                    messages: vec![ChatMessage::user(prompt)],
                    temperature: options.temperature,
                    max_tokens: options.max_tokens,
                    n: 1,
                };
                let request = &request;
                with_retry(&self.retry_policy, "chat completion", move || {
                    self.chat_request(request)
                })
                .await
            }
            ApiMode::Completion => {
                let request = CompletionRequest {
                    model: model.to_string(),
                    prompt: prompt.to_string(),
                    temperature: options.temperature,
                    max_tokens: options.max_tokens,
                    top_p: 1.0,
                    frequency_penalty: 0.0,
                    presence_penalty: 0.0,
                };
                let request = &request;
                with_retry(&self.retry_policy, "text completion", move || {
                    self.completion_request(request)
                })
                .await
            }
        }
    }
}

/// Chat completion request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    n: u32,
}

/// Legacy completion request format.
///
/// Older clients named the model with an `engine` field. The completions
/// endpoint now only accepts `model`, so that is what gets sent.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

//! Embedding client using the OpenAI embeddings API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::llm::OPENAI_API_BASE;
use crate::retry::{parse_retry_after, with_retry, ProviderError, RetryPolicy};

/// Client for generating embeddings via OpenAI.
pub struct EmbeddingClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    retry_policy: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            model,
            dimension,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn request(&self, request: &EmbeddingRequest) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), text, retry_after));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::parse_error(format!("Failed to parse embedding response: {} - {}", e, text))
        })?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        data.into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::parse_error("No embedding returned".to_string()))
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: vec![normalize_input(text)],
        };

        let request = &request;
        let embedding =
            with_retry(&self.retry_policy, "embedding", move || self.request(request)).await?;

        if embedding.len() != self.dimension {
            tracing::warn!(
                "Embedding has dimension {} but expected {}",
                embedding.len(),
                self.dimension
            );
        }

        Ok(embedding)
    }
}

/// Newlines are flattened to spaces before embedding.
fn normalize_input(text: &str) -> String {
    text.replace('\n', " ")
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

//! Pinecone client for the pod-based controller and data-plane APIs.
//!
//! The controller (`https://controller.{environment}.pinecone.io`) manages
//! indexes; each index is served from its own data-plane host, resolved via
//! `describe_index`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use super::types::{IndexSpec, MemoryRecord, QueryMatch};
use super::VectorIndex;
use crate::retry::{parse_retry_after, with_retry, ProviderError, RetryPolicy};

/// How often to poll a freshly created index for readiness.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Give up waiting for a new index after this many polls.
const READY_POLL_LIMIT: u32 = 60;

/// Controller URL for a Pinecone environment such as `us-east1-gcp`.
pub fn controller_url(environment: &str) -> String {
    format!("https://controller.{}.pinecone.io", environment)
}

/// Send a request and return the body text of a successful response.
async fn execute(request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await.map_err(ProviderError::from_transport)?;

    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(ProviderError::from_status(status.as_u16(), text, retry_after));
    }

    Ok(text)
}

fn parse_body<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    serde_json::from_str(text).map_err(|e| {
        ProviderError::parse_error(format!("Failed to parse Pinecone response: {} - {}", e, text))
    })
}

/// Index management client.
pub struct PineconeController {
    client: Client,
    api_key: String,
    url: String,
    retry_policy: RetryPolicy,
}

impl PineconeController {
    pub fn new(api_key: &str, url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            url: url.trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Names of all indexes in the project.
    pub async fn list_indexes(&self) -> anyhow::Result<Vec<String>> {
        with_retry(&self.retry_policy, "list indexes", move || async move {
            let text = execute(
                self.client
                    .get(format!("{}/databases", self.url))
                    .header("Api-Key", &self.api_key),
            )
            .await?;
            parse_body::<Vec<String>>(&text)
        })
        .await
    }

    pub async fn create_index(&self, spec: &IndexSpec) -> anyhow::Result<()> {
        with_retry(&self.retry_policy, "create index", move || async move {
            execute(
                self.client
                    .post(format!("{}/databases", self.url))
                    .header("Api-Key", &self.api_key)
                    .json(spec),
            )
            .await
            .map(|_| ())
        })
        .await
    }

    pub async fn describe_index(&self, name: &str) -> anyhow::Result<IndexDescription> {
        with_retry(&self.retry_policy, "describe index", move || async move {
            let text = execute(
                self.client
                    .get(format!("{}/databases/{}", self.url, name))
                    .header("Api-Key", &self.api_key),
            )
            .await?;
            parse_body::<IndexDescription>(&text)
        })
        .await
    }

    /// Create the index if it does not exist, wait for it to be ready and
    /// return a data-plane handle.
    pub async fn ensure_index(&self, spec: &IndexSpec) -> anyhow::Result<PineconeIndex> {
        let existing = self.list_indexes().await?;
        if existing.iter().any(|name| name == &spec.name) {
            tracing::info!("Using existing index '{}'", spec.name);
        } else {
            tracing::info!(
                "Creating index '{}' (dimension={}, metric={}, pod_type={})",
                spec.name,
                spec.dimension,
                spec.metric,
                spec.pod_type
            );
            self.create_index(spec).await?;
        }

        for _ in 0..READY_POLL_LIMIT {
            let description = self.describe_index(&spec.name).await?;
            match description.status.host {
                Some(host) if description.status.ready => {
                    return Ok(PineconeIndex::new(&self.api_key, &host)
                        .with_retry_policy(self.retry_policy.clone()));
                }
                _ => {
                    tracing::debug!("Index '{}' not ready yet", spec.name);
                    tokio::time::sleep(READY_POLL_INTERVAL).await;
                }
            }
        }

        anyhow::bail!("Index '{}' did not become ready", spec.name)
    }
}

/// Response of `GET /databases/{name}`.
#[derive(Debug, Deserialize)]
pub struct IndexDescription {
    pub status: IndexStatus,
}

#[derive(Debug, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub host: Option<String>,
}

/// Data-plane handle to a single index.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl PineconeIndex {
    /// `host` may be a bare hostname (as returned by the controller) or a full URL.
    pub fn new(api_key: &str, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[MemoryRecord]) -> anyhow::Result<()> {
        let body = json!({ "vectors": records });
        let body = &body;
        with_retry(&self.retry_policy, "vector upsert", move || async move {
            execute(
                self.client
                    .post(format!("{}/vectors/upsert", self.base_url))
                    .header("Api-Key", &self.api_key)
                    .json(body),
            )
            .await
            .map(|_| ())
        })
        .await
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> anyhow::Result<Vec<QueryMatch>> {
        let body = json!({
            "vector": embedding,
            "topK": top_k,
            "includeMetadata": true,
        });
        let body = &body;
        let response = with_retry(&self.retry_policy, "vector query", move || async move {
            let text = execute(
                self.client
                    .post(format!("{}/query", self.base_url))
                    .header("Api-Key", &self.api_key)
                    .json(body),
            )
            .await?;
            parse_body::<QueryResponse>(&text)
        })
        .await?;

        Ok(response.matches)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

//! Memory subsystem: embeddings plus an external similarity index.
//!
//! This module provides:
//! - Storage of completed task results as embedded vectors
//! - Similarity search over those results to build execution context
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  remember / context  ┌──────────────────┐
//! │   Orchestrator   │─────────────────────▶│ ContextRetriever │
//! └──────────────────┘                      └────────┬─────────┘
//!                                  embed             │           upsert / query
//!                        ┌───────────────────────────┴──────────────────┐
//!                        ▼                                              ▼
//!                  ┌──────────┐                                  ┌──────────────┐
//!                  │ Embedder │                                  │ VectorIndex  │
//!                  │ (OpenAI) │                                  │  (Pinecone)  │
//!                  └──────────┘                                  └──────────────┘
//! ```

mod embed;
mod pinecone;
mod retriever;
mod types;

pub use embed::EmbeddingClient;
pub use pinecone::{controller_url, IndexDescription, IndexStatus, PineconeController, PineconeIndex};
pub use retriever::ContextRetriever;
pub use types::*;

use async_trait::async_trait;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// External nearest-neighbour index over embedded records.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id.
    async fn upsert(&self, records: &[MemoryRecord]) -> anyhow::Result<()>;

    /// Up to `top_k` nearest records, metadata included.
    async fn query(&self, embedding: &[f32], top_k: usize) -> anyhow::Result<Vec<QueryMatch>>;
}

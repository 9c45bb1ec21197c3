//! Memory retriever: stores task results and fetches similar ones as context.

use std::sync::Arc;

use super::types::{MemoryRecord, QueryMatch, TaskMetadata};
use super::{Embedder, VectorIndex};

/// Facade over the embedder and the index used by the orchestrator.
///
/// Every call embeds its input once; nothing is cached.
pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl ContextRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `result` and store it under `result_{task_id}`.
    pub async fn remember(
        &self,
        task_id: &str,
        task: &str,
        result: &str,
    ) -> anyhow::Result<MemoryRecord> {
        let embedding = self.embedder.embed(result).await?;
        let record = MemoryRecord {
            id: MemoryRecord::result_id(task_id),
            embedding,
            metadata: TaskMetadata {
                task: task.to_string(),
                result: result.to_string(),
            },
        };

        self.index.upsert(std::slice::from_ref(&record)).await?;
        tracing::debug!("Stored {} in memory", record.id);
        Ok(record)
    }

    /// Up to `n` matches for `query`, best first.
    pub async fn search(&self, query: &str, n: usize) -> anyhow::Result<Vec<QueryMatch>> {
        let embedding = self.embedder.embed(query).await?;
        let mut matches = self.index.query(&embedding, n).await?;
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    /// Task names of the `n` stored results most similar to `query`, best first.
    pub async fn context(&self, query: &str, n: usize) -> anyhow::Result<Vec<String>> {
        let matches = self.search(query, n).await?;
        Ok(matches
            .into_iter()
            .filter_map(|m| m.metadata.map(|meta| meta.task))
            .collect())
    }
}

//! Types for the memory subsystem.

use serde::{Deserialize, Serialize};

/// Dimension of `text-embedding-ada-002` vectors, and of the index.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Metadata attached to every stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task: String,
    pub result: String,
}

/// A completed task's result, as written to the vector index.
///
/// Created once per completed task and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    #[serde(rename = "values")]
    pub embedding: Vec<f32>,
    pub metadata: TaskMetadata,
}

impl MemoryRecord {
    /// Record id for the result of task `task_id`.
    pub fn result_id(task_id: impl std::fmt::Display) -> String {
        format!("result_{}", task_id)
    }
}

/// A nearest-neighbour hit returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    /// Absent when the record was stored without metadata.
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
}

/// Parameters used when the index has to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub pod_type: String,
}

impl IndexSpec {
    /// Cosine index sized for ada-002 embeddings.
    pub fn cosine(name: impl Into<String>, pod_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: EMBEDDING_DIMENSION,
            metric: "cosine".to_string(),
            pod_type: pod_type.into(),
        }
    }
}

//! # taskloop
//!
//! An autonomous task loop: given an objective and a first task, it keeps
//! executing the next task, folding the result into a shared artifact,
//! remembering it in a vector index, creating follow-up tasks and
//! reprioritizing the queue.
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │          Orchestrator            │
//!        │  (queue, artifact, goals, ids)   │
//!        └───────┬──────────────────┬───────┘
//!                │                  │
//!                ▼                  ▼
//!        ┌──────────────┐   ┌──────────────────┐
//!        │    agents    │   │ ContextRetriever │
//!        │ (prompts +   │   │ (embed + index)  │
//!        │  parsers)    │   └───────┬──────────┘
//!        └──────┬───────┘           │
//!               ▼                   ▼
//!        ┌──────────────┐   ┌──────────────────┐
//!        │  LlmClient   │   │ Embedder /       │
//!        │  (OpenAI)    │   │ VectorIndex      │
//!        └──────────────┘   └──────────────────┘
//! ```
//!
//! ## Modules
//! - `orchestrator`: the loop and its state
//! - `agents`: one prompt/parse pair per decision the loop makes
//! - `llm`: completion client trait and the OpenAI implementation
//! - `memory`: embeddings, the Pinecone index and context retrieval
//! - `retry`: provider error taxonomy and backoff
//! - `task`: tasks, ids and the queue
//! - `config` / `cli`: environment-driven configuration

pub mod agents;
pub mod cli;
pub mod config;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod parsing;
pub mod report;
pub mod retry;
pub mod task;
pub mod util;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use orchestrator::{Orchestrator, StepOutcome, StopReason};

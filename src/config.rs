//! Configuration management for taskloop.
//!
//! Configuration is read from environment variables (after `.env` overlays
//! have been applied by the binary):
//! - `OPENAI_API_KEY` - Required. OpenAI API key.
//! - `OPENAI_API_MODEL` - Optional. Model for all agents. Defaults to `gpt-3.5-turbo`.
//! - `OPENAI_API_BASE` - Optional. API base URL. Defaults to `https://api.openai.com/v1`.
//! - `EMBEDDING_MODEL` - Optional. Defaults to `text-embedding-ada-002`.
//! - `PINECONE_API_KEY` - Required. Pinecone API key.
//! - `PINECONE_ENVIRONMENT` - Optional. Defaults to `us-east1-gcp`.
//! - `PINECONE_CONTROLLER_URL` - Optional. Overrides the controller URL derived from the environment.
//! - `PINECONE_POD_TYPE` - Optional. Pod type for a newly created index. Defaults to `p1`.
//! - `TABLE_NAME` - Required. Name of the vector index.
//! - `OBJECTIVE` - Required. The overall goal.
//! - `FIRST_TASK` - Required. The task the loop starts from.
//! - `INITIAL_ARTIFACT` - Optional. Starting artifact text. Defaults to `nothing`.
//! - `LOOP_DELAY_MS` - Optional. Pause between iterations. Defaults to `1000`.
//! - `MAX_ITERATIONS` - Optional. Stop after this many iterations. Unbounded when unset.
//! - `MAX_CONSECUTIVE_FAILURES` - Optional. Abort after this many failed iterations in a row. Defaults to `5`.
//! - `LLM_MAX_RETRIES` - Optional. Retries per provider call. Defaults to `3`.
//! - `ENABLE_REFINEMENT` - Optional. Break coarse tasks into subtasks before executing.
//! - `ENABLE_GOALS` - Optional. Derive success criteria and stop once they are met.
//! - `ENABLE_DELEGATION` - Optional. Log a module delegation plan for new tasks.

use std::time::Duration;

use thiserror::Error;

use crate::llm::OPENAI_API_BASE;
use crate::memory::controller_url;
use crate::util::parse_bool_flag;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is missing from .env")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// OpenAI access.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub embedding_model: String,
    pub max_retries: u32,
}

/// Pinecone access and the index to use.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub controller_url: String,
    pub index_name: String,
    pub pod_type: String,
}

/// Optional loop stages, all off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub refinement: bool,
    pub goals: bool,
    pub delegation: bool,
}

/// Loop pacing and limits.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub objective: String,
    pub first_task: String,
    pub initial_artifact: String,
    pub delay: Duration,
    pub max_iterations: Option<u64>,
    pub max_consecutive_failures: u32,
    pub stages: StageFlags,
}

impl LoopConfig {
    /// Defaults for everything but the objective and first task.
    pub fn new(objective: impl Into<String>, first_task: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            first_task: first_task.into(),
            initial_artifact: "nothing".to_string(),
            delay: Duration::from_millis(1000),
            max_iterations: None,
            max_consecutive_failures: 5,
            stages: StageFlags::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub pinecone: PineconeConfig,
    pub run: LoopConfig,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when a required variable is unset
    /// or empty, `ConfigError::InvalidValue` when a numeric one does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()));

        let llm = LlmConfig {
            api_key: required("OPENAI_API_KEY")?,
            model: get("OPENAI_API_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            api_base: get("OPENAI_API_BASE").unwrap_or_else(|| OPENAI_API_BASE.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-ada-002".to_string()),
            max_retries: parse_number(&get, "LLM_MAX_RETRIES")?.unwrap_or(3),
        };

        let environment =
            get("PINECONE_ENVIRONMENT").unwrap_or_else(|| "us-east1-gcp".to_string());
        let pinecone = PineconeConfig {
            api_key: required("PINECONE_API_KEY")?,
            controller_url: get("PINECONE_CONTROLLER_URL")
                .unwrap_or_else(|| controller_url(&environment)),
            index_name: required("TABLE_NAME")?,
            pod_type: get("PINECONE_POD_TYPE").unwrap_or_else(|| "p1".to_string()),
        };

        let mut run = LoopConfig::new(required("OBJECTIVE")?, required("FIRST_TASK")?);
        if let Some(artifact) = get("INITIAL_ARTIFACT") {
            run.initial_artifact = artifact;
        }
        if let Some(ms) = parse_number(&get, "LOOP_DELAY_MS")? {
            run.delay = Duration::from_millis(ms);
        }
        run.max_iterations = parse_number(&get, "MAX_ITERATIONS")?;
        if let Some(n) = parse_number(&get, "MAX_CONSECUTIVE_FAILURES")? {
            run.max_consecutive_failures = n;
        }
        run.stages = StageFlags {
            refinement: parse_bool_flag(get("ENABLE_REFINEMENT").as_deref(), false),
            goals: parse_bool_flag(get("ENABLE_GOALS").as_deref(), false),
            delegation: parse_bool_flag(get("ENABLE_DELEGATION").as_deref(), false),
        };

        Ok(Self { llm, pinecone, run })
    }

    /// Models whose usage is worth a cost warning at startup.
    pub fn is_expensive_model(&self) -> bool {
        self.llm.model.to_lowercase().contains("gpt-4")
    }
}

fn parse_number<T, G>(get: &G, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
        })
        .transpose()
}

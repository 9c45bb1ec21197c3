//! LLM client module for interacting with language models.
//!
//! This module provides a trait-based abstraction over text-generation
//! providers, with the OpenAI HTTP API as the primary implementation.
//! Agents only ever need "prompt in, text out", so the trait is a single
//! [`LlmClient::complete`] call.

mod openai;

pub use openai::{OpenAiClient, OPENAI_API_BASE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    /// Single user turn, the only shape the agents send.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Which provider endpoint a model identifier is served from.
///
/// Selection is by naming convention: `gpt-*` models are chat models,
/// anything else goes to the legacy text-completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    Chat,
    Completion,
}

impl ApiMode {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("gpt-") {
            ApiMode::Chat
        } else {
            ApiMode::Completion
        }
    }
}

/// Sampling parameters for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: f64,
    /// Maximum output tokens to generate.
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 100,
        }
    }
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text for `prompt` and return the trimmed top choice.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> anyhow::Result<String>;
}

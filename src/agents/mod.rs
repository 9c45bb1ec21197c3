//! Agents module - prompt-driven helpers around the language model.
//!
//! # Agents
//! - **creation**: new tasks from the last result; success criteria for the objective
//! - **prioritization**: reorders and renumbers the pending queue
//! - **execution**: performs one task with retrieved context
//! - **refinement**: decides whether a task is actionable and breaks it down if not
//! - **artifact**: rewrites the shared artifact; decides whether the objective is met
//! - **delegation**: assigns tasks to capability modules
//!
//! Each agent is a pure prompt builder plus a pure response parser, glued
//! together by one call through [`AgentContext::ask`]. Parsers never fail:
//! output that does not fit the expected shape yields an empty or neutral
//! result.

mod artifact;
mod creation;
mod delegation;
mod execution;
mod prioritization;
mod refinement;
mod verdict;

pub use artifact::{
    decide_if_done, done_prompt, modify_artifact, modify_artifact_prompt,
};
pub use creation::{
    create_goals, create_tasks, goal_creation_prompt, task_creation_prompt,
};
pub use delegation::{
    delegate, delegation_prompt, parse_delegation_plan, Assignment, MODULES,
};
pub use execution::{execute_task, execution_prompt, CONTEXT_SIZE};
pub use prioritization::{parse_prioritized_tasks, prioritization_prompt, prioritize};
pub use refinement::{
    check_readiness, readiness_prompt, refine_task, refinement_prompt, Refinement,
};
pub use verdict::{ArtifactVerdict, DoneVerdict, Readiness};

use std::sync::Arc;

use crate::llm::{CompletionOptions, LlmClient};

/// What every agent needs: a model to talk to and the objective to serve.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LlmClient>,
    pub model: String,
    pub objective: String,
}

impl AgentContext {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            objective: objective.into(),
        }
    }

    /// Send one prompt with the configured model.
    pub async fn ask(&self, prompt: &str, options: CompletionOptions) -> anyhow::Result<String> {
        self.llm.complete(&self.model, prompt, options).await
    }
}

/// Render strings as a bracketed, quoted list, the way prompts show
/// collections to the model.
pub(crate) fn quoted_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{}'", item)).collect();
    format!("[{}]", quoted.join(", "))
}

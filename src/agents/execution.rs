//! Task execution with retrieved context.

use super::{quoted_list, AgentContext};
use crate::llm::CompletionOptions;
use crate::memory::ContextRetriever;

/// How many prior tasks are pulled in as context.
pub const CONTEXT_SIZE: usize = 5;

pub fn execution_prompt(objective: &str, context: &[String], task: &str) -> String {
    format!(
        "You are an AI who performs one task based on the following objective: {}.\nTake into account these previously completed tasks: {}\nYour task: {}\nResponse:",
        objective,
        quoted_list(context),
        task
    )
}

/// Perform `task` and return the model's answer verbatim (trimmed).
///
/// Context is retrieved by similarity to the objective, not to the task.
pub async fn execute_task(
    ctx: &AgentContext,
    retriever: &ContextRetriever,
    task: &str,
) -> anyhow::Result<String> {
    let context = retriever.context(&ctx.objective, CONTEXT_SIZE).await?;
    tracing::debug!("Executing with {} context entries", context.len());

    let prompt = execution_prompt(&ctx.objective, &context, task);
    ctx.ask(
        &prompt,
        CompletionOptions::default()
            .with_temperature(0.7)
            .with_max_tokens(2000),
    )
    .await
}

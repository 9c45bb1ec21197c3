//! Reprioritization of the pending queue.

use super::{quoted_list, AgentContext};
use crate::llm::CompletionOptions;
use crate::task::{Task, TaskId};

pub fn prioritization_prompt(task_names: &[String], objective: &str, next_task_id: u64) -> String {
    format!(
        "You are an task prioritization AI tasked with cleaning the formatting of and reprioritizing the following tasks: {}. Consider the ultimate objective of your team:{}. Do not remove any tasks. Return the result as a numbered list, like:
    #. First task
    #. Second task
    Start the task list with number {}.",
        quoted_list(task_names),
        objective,
        next_task_id
    )
}

/// Rebuild a task list from a numbered response.
///
/// Each line is split at its first `.`: the left side becomes the id as
/// written, the right side the name. Lines without a `.` are dropped.
pub fn parse_prioritized_tasks(response: &str) -> Vec<Task> {
    response
        .split('\n')
        .filter_map(|line| {
            let (id, name) = line.trim().split_once('.')?;
            Some(Task::new(TaskId::new(id.trim()), name.trim()))
        })
        .collect()
}

/// Ask for a cleaned, reordered list numbered from `this_task_id + 1`.
///
/// Nothing checks that every input task survives; the prompt asks for it.
pub async fn prioritize(
    ctx: &AgentContext,
    task_names: &[String],
    this_task_id: u64,
) -> anyhow::Result<Vec<Task>> {
    let prompt = prioritization_prompt(
        task_names,
        &ctx.objective,
        this_task_id.saturating_add(1),
    );
    let response = ctx.ask(&prompt, CompletionOptions::default()).await?;

    let tasks = parse_prioritized_tasks(&response);
    if tasks.len() != task_names.len() {
        tracing::warn!(
            "Prioritization returned {} tasks for {} inputs",
            tasks.len(),
            task_names.len()
        );
    }
    Ok(tasks)
}

//! Task creation and goal (success criteria) creation.

use super::AgentContext;
use crate::llm::CompletionOptions;
use crate::parsing::parse_bullet_points;

/// The result as the creation prompt presents it, wrapped in a `data` record.
pub fn enriched_result(result: &str) -> String {
    format!("{{'data': '{}'}}", result)
}

pub fn task_creation_prompt(
    objective: &str,
    result: &str,
    task_description: &str,
    incomplete_tasks: &[String],
) -> String {
    format!(
        "You are an task creation AI that uses the result of an execution agent to create new tasks with the following objective: {}, The last completed task has the result: {}. This result was based on this task description: {}. These are incomplete tasks: {}. Based on the result, create new tasks to be completed by the AI system that do not overlap with incomplete tasks. Return the tasks as an array.",
        objective,
        enriched_result(result),
        task_description,
        incomplete_tasks.join(", ")
    )
}

/// Names of follow-up tasks derived from the last result. Ids are assigned
/// by the caller.
pub async fn create_tasks(
    ctx: &AgentContext,
    result: &str,
    task_description: &str,
    incomplete_tasks: &[String],
) -> anyhow::Result<Vec<String>> {
    let prompt = task_creation_prompt(&ctx.objective, result, task_description, incomplete_tasks);
    let response = ctx
        .ask(&prompt, CompletionOptions::default().with_max_tokens(200))
        .await?;

    let names = parse_bullet_points(&response);
    tracing::debug!("Task creation produced {} new tasks", names.len());
    Ok(names)
}

pub fn goal_creation_prompt(objective: &str) -> String {
    format!(
        "This is our objective: {}.\n\nI want to know when we're done. Please create a list of criteria to define our objective. We'll be done when all the criteria are satisfied.\n\nReturn the criteria as a list of bullet points.",
        objective
    )
}

/// Success criteria for the objective.
pub async fn create_goals(ctx: &AgentContext) -> anyhow::Result<Vec<String>> {
    let prompt = goal_creation_prompt(&ctx.objective);
    let response = ctx.ask(&prompt, CompletionOptions::default()).await?;
    Ok(parse_bullet_points(&response))
}

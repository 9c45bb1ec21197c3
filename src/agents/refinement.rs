//! Readiness check and task breakdown.

use super::verdict::Readiness;
use super::AgentContext;
use crate::llm::CompletionOptions;
use crate::parsing::parse_bullet_points;

pub fn readiness_prompt(task: &str) -> String {
    format!(
        r#"
You are an AI agent who's only job is to determine if a task is simple enough that an average person knows how to do it or if it would be helpful to break the task down further into easier steps.  If a task is actionable respond with only the word "READY".  If a task needs to be broken down respond with only the word "REFINE".

Example 1:
Input: Create a Website
Output: REFINE

Example 2:
Input: Decide a domain name and use a service like GoDaddy to check availability and purchase the domain
Output: READY

Example 3:
Input: Order Takeout
Output: READY

Example 4:
Input: Pay your credit card bill
Output: READY

Example 5:
Input: Brainstorm and outline the story, including character, setting, plot, and theme.
Output: READY

Example 6:
Input: Write a short story about a wizard who becomes a bird.
Output: REFINE

Prompt:
Input: {}
"#,
        task
    )
}

pub fn refinement_prompt(task: &str) -> String {
    format!(
        "\nYou're a project planning AI agent that is tasked with helping people break down goals into a list\nof actionable tasks that an average person knows how to do. Please break down the following task.\nTask: {}",
        task
    )
}

/// Outcome of refining a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refinement {
    /// The task is actionable as written.
    Ready(String),
    /// The task was broken down into these steps.
    Subtasks(Vec<String>),
}

pub async fn check_readiness(ctx: &AgentContext, task: &str) -> anyhow::Result<Readiness> {
    let response = ctx
        .ask(&readiness_prompt(task), CompletionOptions::default())
        .await?;
    Ok(Readiness::classify(&response))
}

/// Return the task unchanged when it is ready, otherwise its breakdown.
pub async fn refine_task(ctx: &AgentContext, task: &str) -> anyhow::Result<Refinement> {
    if check_readiness(ctx, task).await? == Readiness::Ready {
        return Ok(Refinement::Ready(task.to_string()));
    }

    let response = ctx
        .ask(&refinement_prompt(task), CompletionOptions::default())
        .await?;
    tracing::info!("More detailed plan for '{}':\n{}", task, response);
    Ok(Refinement::Subtasks(parse_bullet_points(&response)))
}

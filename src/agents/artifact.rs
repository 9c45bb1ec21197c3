//! Artifact rewriting and the "are we done?" check.

use super::verdict::{ArtifactVerdict, DoneVerdict};
use super::AgentContext;
use crate::llm::CompletionOptions;
use crate::util::preview;

pub fn modify_artifact_prompt(objective: &str, artifact: &str, task: &str, result: &str) -> String {
    format!(
        "{}\n\nThat's what we've written so far.\n\nWe're trying to complete this objective: {}.\n\nWe've decided to do this task: {}.\n\nThis is the result of that: {}.\n\nDo you think we should rewrite what we've written so far based on the result of that task? If no, please give a single word answer of 'no'. If yes, please give a single word answer of 'yes' and then rewrite what we've written so far to incorporate the result of that task.",
        artifact, objective, task, result
    )
}

/// Return the artifact after considering `result`.
///
/// A `no` or an unrecognized answer leaves the artifact untouched; the latter
/// is logged and never treated as an error.
pub async fn modify_artifact(
    ctx: &AgentContext,
    artifact: &str,
    task: &str,
    result: &str,
) -> anyhow::Result<String> {
    let prompt = modify_artifact_prompt(&ctx.objective, artifact, task, result);
    let response = ctx
        .ask(&prompt, CompletionOptions::default().with_max_tokens(2000))
        .await?;

    match ArtifactVerdict::classify(&response) {
        ArtifactVerdict::Rewrite(text) => Ok(text),
        ArtifactVerdict::Keep => {
            tracing::debug!("Artifact kept after '{}'", task);
            Ok(artifact.to_string())
        }
        ArtifactVerdict::Unrecognized(raw) => {
            tracing::warn!("Confusing artifact response: {}", preview(&raw, 200));
            Ok(artifact.to_string())
        }
    }
}

pub fn done_prompt(objective: &str, goals: &[String], artifact: &str) -> String {
    format!(
        "We're trying to complete this objective: {}.\n\nHere are the criteria for success:{}\n\nThis is what we've written so far: {}.\n\nDo you think the objective is complete? If yes, please give a single word answer of 'yes'. If no, please list the criteria which have not yet been achieved",
        objective,
        goals.join("\n"),
        artifact
    )
}

pub async fn decide_if_done(
    ctx: &AgentContext,
    goals: &[String],
    artifact: &str,
) -> anyhow::Result<DoneVerdict> {
    let prompt = done_prompt(&ctx.objective, goals, artifact);
    let response = ctx
        .ask(&prompt, CompletionOptions::default().with_max_tokens(10))
        .await?;
    Ok(DoneVerdict::classify(&response))
}

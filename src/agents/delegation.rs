//! Delegation planning: which capability module should handle each task.

use super::AgentContext;
use crate::llm::CompletionOptions;

/// Capability modules a task can be assigned to.
pub const MODULES: &[&str] = &[
    "write text",
    "ask a human",
    "get more information",
    "generate an image",
    "refine the task into subtasks",
];

/// One line of a delegation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task: String,
    pub module: String,
}

pub fn delegation_prompt(modules: &[&str], tasks: &[String]) -> String {
    format!(
        "You are a project planning AI agent that is tasked with breaking down problems into actionable steps and assigning those problems to one of the following AI modules: {}.\n\nFor each task, decide which module to assign it to.\n\nUse syntax like this:\n\nTask: Module\nTask: Module\n\nHere are the tasks to process:\n\n{}",
        modules.join(", "),
        tasks.join("\n")
    )
}

/// Parse `Task: Module` lines. The split is on the first `:`; lines without
/// one are dropped.
pub fn parse_delegation_plan(response: &str) -> Vec<Assignment> {
    response
        .lines()
        .filter_map(|line| {
            let (task, module) = line.split_once(':')?;
            let task = task.trim();
            if task.is_empty() {
                return None;
            }
            Some(Assignment {
                task: task.to_string(),
                module: module.trim().to_string(),
            })
        })
        .collect()
}

/// Ask for a plan covering `tasks`. The plan is advisory: it is logged and
/// returned, nothing dispatches on it.
pub async fn delegate(ctx: &AgentContext, tasks: &[String]) -> anyhow::Result<Vec<Assignment>> {
    let prompt = delegation_prompt(MODULES, tasks);
    let response = ctx
        .ask(&prompt, CompletionOptions::default().with_max_tokens(1000))
        .await?;
    tracing::info!("Generated delegation plan:\n{}", response);

    let plan = parse_delegation_plan(&response);
    for assignment in &plan {
        if !MODULES.contains(&assignment.module.as_str()) {
            tracing::debug!(
                "Task '{}' assigned to unknown module '{}'",
                assignment.task,
                assignment.module
            );
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    #[test]
    fn test_parse_plan() {
        let plan = parse_delegation_plan(
            "Here is the plan\nPick a name: write text\nCheck facts: get more information: web\n: orphan\n",
        );
        assert_eq!(
            plan,
            vec![
                Assignment {
                    task: "Pick a name".to_string(),
                    module: "write text".to_string(),
                },
                Assignment {
                    task: "Check facts".to_string(),
                    module: "get more information: web".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_prompt_lists_modules_and_tasks() {
        let prompt = delegation_prompt(MODULES, &["A".to_string(), "B".to_string()]);
        assert!(prompt.contains("modules: write text, ask a human, get more information"));
        assert!(prompt.ends_with("Here are the tasks to process:\n\nA\nB"));
    }

    #[tokio::test]
    async fn test_delegate() {
        let llm = Arc::new(ScriptedLlm::new().on(
            "assigning those problems",
            ["Draw the cover: generate an image"],
        ));
        let ctx = AgentContext::new(llm.clone(), "gpt-3.5-turbo", "Write a story");

        let plan = delegate(&ctx, &["Draw the cover".to_string()]).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].module, "generate an image");
        assert_eq!(llm.calls()[0].options.max_tokens, 1000);
    }
}

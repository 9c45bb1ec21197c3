//! The task loop.
//!
//! One iteration:
//! 1. pop the next task (optionally refining it into subtasks first)
//! 2. execute it with context retrieved for the objective
//! 3. let the artifact agent rewrite the artifact
//! 4. store the result in vector memory
//! 5. create follow-up tasks and append them with fresh ids
//! 6. reprioritize the whole queue
//!
//! When the queue is empty but some task has completed before, steps 5-6 run
//! again from that last completed task. An iteration's changes to the queue,
//! the artifact and the id allocator are applied only once every step has
//! succeeded; a failed iteration puts its task back at the head of the queue.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::agents::{
    create_goals, create_tasks, decide_if_done, delegate, execute_task, modify_artifact,
    prioritize, refine_task, AgentContext, DoneVerdict, Refinement,
};
use crate::config::LoopConfig;
use crate::report;
use crate::llm::LlmClient;
use crate::memory::ContextRetriever;
use crate::task::{Task, TaskIdAllocator, TaskQueue};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("giving up after {failures} consecutive failed iterations; last error: {last_error}")]
    TooManyFailures { failures: u32, last_error: String },
}

/// What a single call to [`Orchestrator::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A task was executed and the queue replanned.
    Completed { task: Task, result: String },
    /// A task was broken down; its subtasks now lead the queue.
    Refined { task: Task, subtasks: Vec<Task> },
    /// The queue was empty and was replanned from the last completed task.
    Replanned,
    /// The queue was empty and nothing has completed yet.
    Idle,
    /// The done check found the objective complete.
    Done,
}

/// Why [`Orchestrator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    Done,
    IterationLimit,
}

#[derive(Debug, Clone)]
struct CompletedTask {
    task: Task,
    result: String,
}

/// Sole owner of the loop's mutable state.
pub struct Orchestrator {
    agents: AgentContext,
    retriever: ContextRetriever,
    config: LoopConfig,
    queue: TaskQueue,
    ids: TaskIdAllocator,
    artifact: String,
    goals: Option<Vec<String>>,
    last_completed: Option<CompletedTask>,
    iterations: u64,
    consecutive_failures: u32,
}

impl Orchestrator {
    /// Seed the queue with the first task under id 1.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        retriever: ContextRetriever,
        config: LoopConfig,
    ) -> Self {
        let agents = AgentContext::new(llm, model, config.objective.clone());

        let mut queue = TaskQueue::new();
        queue.push_back(Task::new(1u64, config.first_task.clone()));

        Self {
            agents,
            retriever,
            artifact: config.initial_artifact.clone(),
            config,
            queue,
            ids: TaskIdAllocator::starting_after(1),
            goals: None,
            last_completed: None,
            iterations: 0,
            consecutive_failures: 0,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Success criteria, once created. Always empty unless goals are enabled.
    pub fn goals(&self) -> &[String] {
        self.goals.as_deref().unwrap_or_default()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// The most recently completed task and its result.
    pub fn last_completed(&self) -> Option<(&Task, &str)> {
        self.last_completed
            .as_ref()
            .map(|c| (&c.task, c.result.as_str()))
    }

    /// Run one iteration.
    pub async fn step(&mut self) -> anyhow::Result<StepOutcome> {
        self.iterations += 1;
        self.ensure_goals().await?;

        let outcome = if self.queue.is_empty() {
            match self.last_completed.clone() {
                Some(last) => {
                    tracing::debug!("Queue empty, replanning from task {}", last.task.id);
                    self.replan(&last).await?;
                    StepOutcome::Replanned
                }
                None => {
                    tracing::debug!("Queue empty and nothing completed yet");
                    return Ok(StepOutcome::Idle);
                }
            }
        } else {
            report::task_list(&self.queue);
            let Some(task) = self.queue.pop_front() else {
                return Ok(StepOutcome::Idle);
            };
            report::next_task(&task);

            match self.work_on(&task).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.queue.push_front(task);
                    return Err(e);
                }
            }
        };

        if matches!(outcome, StepOutcome::Refined { .. }) || !self.config.stages.goals {
            return Ok(outcome);
        }
        match decide_if_done(&self.agents, self.goals(), &self.artifact).await? {
            DoneVerdict::Done => {
                report::done();
                Ok(StepOutcome::Done)
            }
            DoneVerdict::NotDone(missing) => {
                report::not_done(&missing);
                Ok(outcome)
            }
        }
    }

    /// Step until cancelled, done, out of iterations, or failing too often.
    ///
    /// Cancellation is observed between iterations; an iteration in flight is
    /// allowed to finish.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<StopReason, OrchestratorError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }
            if let Some(max) = self.config.max_iterations {
                if self.iterations >= max {
                    tracing::info!("Reached iteration limit of {}", max);
                    return Ok(StopReason::IterationLimit);
                }
            }

            match self.step().await {
                Ok(StepOutcome::Done) => return Ok(StopReason::Done),
                Ok(outcome) => {
                    self.consecutive_failures = 0;
                    tracing::debug!("Iteration {} finished: {:?}", self.iterations, outcome);
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    tracing::warn!(
                        "Iteration {} failed ({} in a row): {:#}",
                        self.iterations,
                        self.consecutive_failures,
                        e
                    );
                    if self.consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(OrchestratorError::TooManyFailures {
                            failures: self.consecutive_failures,
                            last_error: format!("{:#}", e),
                        });
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
                _ = tokio::time::sleep(self.config.delay) => {}
            }
        }
    }

    async fn ensure_goals(&mut self) -> anyhow::Result<()> {
        if !self.config.stages.goals || self.goals.is_some() {
            return Ok(());
        }
        let goals = create_goals(&self.agents).await?;
        report::goals(&goals);
        self.goals = Some(goals);
        Ok(())
    }

    async fn work_on(&mut self, task: &Task) -> anyhow::Result<StepOutcome> {
        if self.config.stages.refinement {
            if let Refinement::Subtasks(names) = refine_task(&self.agents, &task.name).await? {
                if names.is_empty() {
                    tracing::warn!("Refinement of '{}' produced no subtasks", task.name);
                } else {
                    let subtasks = names
                        .into_iter()
                        .map(|name| Ok(Task::new(self.ids.next_id()?, name)))
                        .collect::<anyhow::Result<Vec<Task>>>()?;
                    for subtask in subtasks.iter().rev() {
                        self.queue.push_front(subtask.clone());
                    }
                    report::subtasks(task, &subtasks);
                    return Ok(StepOutcome::Refined {
                        task: task.clone(),
                        subtasks,
                    });
                }
            }
        }

        let result = execute_task(&self.agents, &self.retriever, &task.name).await?;
        report::task_result(&result);

        let artifact = modify_artifact(&self.agents, &self.artifact, &task.name, &result).await?;
        report::artifact(&artifact);

        self.retriever
            .remember(task.id.as_str(), &task.name, &result)
            .await?;

        let completed = CompletedTask {
            task: task.clone(),
            result: result.clone(),
        };
        self.replan(&completed).await?;

        self.artifact = artifact;
        self.last_completed = Some(completed);
        Ok(StepOutcome::Completed {
            task: task.clone(),
            result,
        })
    }

    /// Create follow-up tasks from `last` and reprioritize. The queue and the
    /// allocator are only replaced when both calls succeed.
    async fn replan(&mut self, last: &CompletedTask) -> anyhow::Result<()> {
        let mut queue = self.queue.clone();
        let mut ids = self.ids.clone();

        let names = create_tasks(&self.agents, &last.result, &last.task.name, &queue.names()).await?;
        if self.config.stages.delegation && !names.is_empty() {
            if let Err(e) = delegate(&self.agents, &names).await {
                tracing::warn!("Delegation planning failed: {:#}", e);
            }
        }
        for name in names {
            queue.push_back(Task::new(ids.next_id()?, name));
        }

        let this_task_id = last.task.id.as_number().unwrap_or_else(|| ids.last());
        let prioritized = prioritize(&self.agents, &queue.names(), this_task_id).await?;
        for task in &prioritized {
            ids.observe(&task.id);
        }
        queue.replace(prioritized);

        self.queue = queue;
        self.ids = ids;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageFlags;
    use crate::testing::{HashEmbedder, InMemoryIndex, ScriptedLlm};
    use std::time::Duration;

    const EXECUTE: &str = "performs one task";
    const ARTIFACT: &str = "That's what we've written so far";
    const CREATE: &str = "task creation AI";
    const PRIORITIZE: &str = "task prioritization AI";

    fn loop_config() -> LoopConfig {
        let mut config = LoopConfig::new("Write a story", "Outline the story");
        config.delay = Duration::ZERO;
        config
    }

    fn orchestrator(llm: Arc<ScriptedLlm>, config: LoopConfig) -> (Orchestrator, Arc<InMemoryIndex>) {
        let index = Arc::new(InMemoryIndex::default());
        let retriever = ContextRetriever::new(Arc::new(HashEmbedder), index.clone());
        (
            Orchestrator::new(llm, "gpt-3.5-turbo", retriever, config),
            index,
        )
    }

    fn basic_llm() -> ScriptedLlm {
        ScriptedLlm::new()
            .on(EXECUTE, ["A three act outline"])
            .on(ARTIFACT, ["Yes. Rewritten: Act one, act two, act three"])
            .on(CREATE, ["- Name characters\n- Pick a setting"])
            .on(PRIORITIZE, ["2. Pick a setting\n3. Name characters"])
    }

    #[tokio::test]
    async fn test_full_iteration() {
        let llm = Arc::new(basic_llm());
        let (mut orch, index) = orchestrator(llm.clone(), loop_config());

        let outcome = orch.step().await.unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                task: Task::new(1u64, "Outline the story"),
                result: "A three act outline".to_string(),
            }
        );

        assert_eq!(orch.artifact(), "Act one, act two, act three");
        assert_eq!(index.ids(), vec!["result_1".to_string()]);
        assert_eq!(orch.queue().names(), vec!["Pick a setting", "Name characters"]);

        let prioritize_call = llm
            .calls()
            .into_iter()
            .find(|c| c.prompt.contains(PRIORITIZE))
            .unwrap();
        assert!(prioritize_call
            .prompt
            .contains("['Name characters', 'Pick a setting']"));
        assert!(prioritize_call.prompt.contains("Start the task list with number 2."));

        let create_call = llm
            .calls()
            .into_iter()
            .find(|c| c.prompt.contains(CREATE))
            .unwrap();
        assert!(create_call
            .prompt
            .contains("has the result: {'data': 'A three act outline'}."));

        let (last, result) = orch.last_completed().unwrap();
        assert_eq!(last.name, "Outline the story");
        assert_eq!(result, "A three act outline");
    }

    #[tokio::test]
    async fn test_idle_when_nothing_completed() {
        let llm = Arc::new(basic_llm());
        let (mut orch, _) = orchestrator(llm.clone(), loop_config());
        orch.queue.pop_front();

        assert_eq!(orch.step().await.unwrap(), StepOutcome::Idle);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue_replans_from_last_completed() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on(EXECUTE, ["A three act outline"])
                .on(ARTIFACT, ["No"])
                .on(CREATE, ["Nothing new", "- Write an epilogue"])
                .on(PRIORITIZE, ["", "5. Write an epilogue"]),
        );
        let (mut orch, _) = orchestrator(llm.clone(), loop_config());

        orch.step().await.unwrap();
        assert!(orch.queue().is_empty());
        assert_eq!(orch.artifact(), "nothing");

        assert_eq!(orch.step().await.unwrap(), StepOutcome::Replanned);
        assert_eq!(orch.queue().names(), vec!["Write an epilogue"]);
        assert_eq!(llm.count(EXECUTE), 1);

        let create_calls: Vec<_> = llm
            .calls()
            .into_iter()
            .filter(|c| c.prompt.contains(CREATE))
            .collect();
        assert_eq!(create_calls.len(), 2);
        assert!(create_calls[1]
            .prompt
            .contains("based on this task description: Outline the story."));
    }

    #[tokio::test]
    async fn test_new_ids_exceed_prioritized_ids() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on(EXECUTE, ["done"])
                .on(ARTIFACT, ["No"])
                .on(CREATE, ["- Next thing"])
                .on(PRIORITIZE, ["10. Next thing", "11. Next thing\n12. Next thing"]),
        );
        let (mut orch, _) = orchestrator(llm.clone(), loop_config());

        orch.step().await.unwrap();
        assert_eq!(orch.queue().iter().next().unwrap().id.as_str(), "10");
        assert_eq!(orch.ids.last(), 10);

        orch.step().await.unwrap();
        // The task created in the second iteration got id 11.
        assert_eq!(orch.ids.last(), 12);
        let second_prioritize = llm
            .calls()
            .into_iter()
            .filter(|c| c.prompt.contains(PRIORITIZE))
            .nth(1)
            .unwrap();
        assert!(second_prioritize
            .prompt
            .contains("Start the task list with number 11."));
    }

    #[tokio::test]
    async fn test_exhausted_ids_fail_the_iteration() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on(EXECUTE, ["done"])
                .on(ARTIFACT, ["No"])
                .on(CREATE, ["- Next thing"])
                .on(PRIORITIZE, ["18446744073709551615. Next thing"]),
        );
        let (mut orch, _) = orchestrator(llm.clone(), loop_config());

        orch.step().await.unwrap();
        assert_eq!(orch.ids.last(), u64::MAX);

        let err = orch.step().await.unwrap_err();
        assert!(err.to_string().contains("no task ids left"));
        let head = orch.queue().iter().next().unwrap();
        assert_eq!(head.id.as_str(), "18446744073709551615");
        assert_eq!(head.name, "Next thing");
        assert_eq!(orch.ids.last(), u64::MAX);
        assert_eq!(llm.count(PRIORITIZE), 1);
    }

    #[tokio::test]
    async fn test_failed_iteration_requeues_task() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on(EXECUTE, ["A three act outline"])
                .on(ARTIFACT, ["No"])
                .fail_then(CREATE, 1, ["- Name characters"])
                .on(PRIORITIZE, ["2. Name characters"]),
        );
        let (mut orch, index) = orchestrator(llm.clone(), loop_config());

        assert!(orch.step().await.is_err());
        assert_eq!(orch.queue().names(), vec!["Outline the story"]);
        assert!(orch.last_completed().is_none());

        let outcome = orch.step().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Completed { .. }));
        assert_eq!(orch.queue().names(), vec!["Name characters"]);
        // The retried upsert overwrote the same record.
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_consecutive_failures() {
        let llm = Arc::new(ScriptedLlm::new().fail_then(EXECUTE, 1, Vec::<&str>::new()));
        let mut config = loop_config();
        config.max_consecutive_failures = 3;
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let err = orch.run(CancellationToken::new()).await.unwrap_err();
        match err {
            OrchestratorError::TooManyFailures { failures, .. } => assert_eq!(failures, 3),
        }
        assert_eq!(llm.count(EXECUTE), 3);
        assert_eq!(orch.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_refinement_puts_subtasks_first() {
        let llm = Arc::new(
            basic_llm()
                .on("determine if a task is simple enough", ["REFINE", "READY"])
                .on(
                    "break down the following task",
                    ["- Pick a genre\n- Sketch the plot"],
                ),
        );
        let mut config = loop_config();
        config.stages = StageFlags {
            refinement: true,
            ..StageFlags::default()
        };
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let outcome = orch.step().await.unwrap();
        match outcome {
            StepOutcome::Refined { task, subtasks } => {
                assert_eq!(task.name, "Outline the story");
                assert_eq!(subtasks[0], Task::new(2u64, "Pick a genre"));
                assert_eq!(subtasks[1], Task::new(3u64, "Sketch the plot"));
            }
            other => panic!("expected refinement, got {:?}", other),
        }
        assert_eq!(orch.queue().names(), vec!["Pick a genre", "Sketch the plot"]);
        assert_eq!(llm.count(EXECUTE), 0);

        let outcome = orch.step().await.unwrap();
        match outcome {
            StepOutcome::Completed { task, .. } => assert_eq!(task.name, "Pick a genre"),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_breakdown_executes_task() {
        let llm = Arc::new(
            basic_llm()
                .on("determine if a task is simple enough", ["REFINE"])
                .on("break down the following task", ["Nothing to break down here."]),
        );
        let mut config = loop_config();
        config.stages = StageFlags {
            refinement: true,
            ..StageFlags::default()
        };
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let outcome = orch.step().await.unwrap();
        match outcome {
            StepOutcome::Completed { task, result } => {
                assert_eq!(task, Task::new(1u64, "Outline the story"));
                assert_eq!(result, "A three act outline");
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(llm.count(EXECUTE), 1);
        assert_eq!(orch.queue().names(), vec!["Pick a setting", "Name characters"]);
    }

    #[tokio::test]
    async fn test_goals_and_done_check() {
        let llm = Arc::new(
            basic_llm()
                .on("I want to know when we're done", ["- Has an ending"])
                .on("Do you think the objective is complete", ["yes"]),
        );
        let mut config = loop_config();
        config.stages.goals = true;
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let reason = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!(reason, StopReason::Done);
        assert_eq!(orch.goals().to_vec(), vec!["Has an ending".to_string()]);
        assert_eq!(orch.iterations(), 1);
    }

    #[tokio::test]
    async fn test_delegation_is_advisory() {
        let llm = Arc::new(basic_llm().on("assigning those problems", ["Name characters: write text"]));
        let mut config = loop_config();
        config.stages.delegation = true;
        let (mut orch, _) = orchestrator(llm.clone(), config);

        orch.step().await.unwrap();
        assert_eq!(llm.count("assigning those problems"), 1);
        assert_eq!(orch.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_at_iteration_limit() {
        let llm = Arc::new(basic_llm());
        let mut config = loop_config();
        config.max_iterations = Some(2);
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let reason = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!(reason, StopReason::IterationLimit);
        assert_eq!(orch.iterations(), 2);
        assert_eq!(llm.count(EXECUTE), 2);
    }

    #[tokio::test]
    async fn test_run_honours_cancelled_token() {
        let llm = Arc::new(basic_llm());
        let (mut orch, _) = orchestrator(llm.clone(), loop_config());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(orch.run(cancel).await.unwrap(), StopReason::Cancelled);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_delay() {
        let llm = Arc::new(basic_llm());
        let mut config = loop_config();
        config.delay = Duration::from_secs(3600);
        let (mut orch, _) = orchestrator(llm.clone(), config);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        assert_eq!(orch.run(cancel).await.unwrap(), StopReason::Cancelled);
        assert_eq!(orch.iterations(), 1);
    }
}

//! Pending-task queue and id allocation.

use std::collections::VecDeque;

use super::task::{Task, TaskId};

/// Ordered collection of pending tasks.
///
/// Consumed FIFO, but the whole order can be swapped out by
/// reprioritization.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Put a task at the head, e.g. to retry it next.
    pub fn push_front(&mut self, task: Task) {
        self.tasks.push_front(task);
    }

    pub fn pop_front(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Discard the current order and adopt `tasks`.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks.into();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }
}

/// Hands out strictly increasing integer task ids.
#[derive(Debug, Clone)]
pub struct TaskIdAllocator {
    last: u64,
}

impl TaskIdAllocator {
    /// `last` is the highest id already in use.
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    /// Fails once every `u64` id has been handed out or observed.
    pub fn next_id(&mut self) -> anyhow::Result<TaskId> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("no task ids left after {}", self.last))?;
        Ok(TaskId::from(self.last))
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    /// Make sure future ids exceed `id` when it is numeric.
    pub fn observe(&mut self, id: &TaskId) {
        if let Some(n) = id.as_number() {
            self.last = self.last.max(n);
        }
    }
}

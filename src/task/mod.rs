//! Task module - tasks, their ids and the pending queue.

mod queue;
pub mod task;

pub use queue::{TaskIdAllocator, TaskQueue};
pub use task::{Task, TaskId};

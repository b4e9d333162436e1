// src/dag/task_info.rs

//! Task metadata and per-run state management.

use std::fmt;
use std::sync::Arc;

use crate::dag::work::TaskWork;
use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task was requested for this run but is waiting on prerequisites.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task work completed successfully in this run.
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed prerequisite).
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Per-task bookkeeping inside one scheduler.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct prerequisites.
    pub prerequisites: Vec<TaskName>,
    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,
}

impl TaskInfo {
    pub fn new(name: TaskName, prerequisites: Vec<TaskName>) -> Self {
        Self {
            name,
            prerequisites,
            run_state: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub work: Arc<dyn TaskWork>,
    /// All tasks dispatched for the same `Runner::run` share this id.
    pub run_id: u64,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

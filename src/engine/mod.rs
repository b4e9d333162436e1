// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the per-run scheduler
//! - the run loop that reacts to task requests and task completions
//! - the clonable [`Runner`] handle behind `run(name)`
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::errors::Result;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task's work for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

impl<T> From<&Result<T>> for TaskOutcome {
    fn from(result: &Result<T>) -> Self {
        if result.is_ok() {
            TaskOutcome::Success
        } else {
            TaskOutcome::Failed
        }
    }
}

/// Events flowing into a run loop.
#[derive(Debug)]
pub enum RunEvent {
    /// A task (and its prerequisites) should take part in the run.
    TaskRequested { task: TaskName },
    /// A task's work finished.
    TaskCompleted { task: TaskName, result: Result<()> },
}

pub mod core;
pub mod event_handlers;
pub mod runner;
pub mod runtime;

pub use core::RunCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runner::Runner;
pub use runtime::RunLoop;

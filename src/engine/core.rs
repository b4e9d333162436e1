// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core" that consumes
//! [`RunEvent`]s and produces:
//! - an updated core state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::RunLoop`) is responsible for reading
//! events from channels and sending `ScheduledTask`s to the executor.
//!
//! The core is unit tested without any Tokio, channels, filesystem or
//! processes.

use tracing::{error, info};

use crate::dag::{Scheduler, TaskRunState};
use crate::engine::event_handlers::{handle_task_completion, handle_task_request, CoreStep};
use crate::engine::{RunEvent, TaskName, TaskOutcome};
use crate::errors::{FlowError, Result};

/// Pure core state of a single `run(name)` invocation.
///
/// This owns the scheduler, the requested target and the first failure seen.
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct RunCore {
    scheduler: Scheduler,
    target: TaskName,
    first_failure: Option<(TaskName, FlowError)>,
}

impl RunCore {
    pub fn new(scheduler: Scheduler, target: impl Into<TaskName>) -> Self {
        Self {
            scheduler,
            target: target.into(),
            first_failure: None,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn run_id(&self) -> u64 {
        self.scheduler.run_id()
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Seed the run with its target.
    pub fn start(&mut self) -> CoreStep {
        let target = self.target.clone();
        self.step(RunEvent::TaskRequested { task: target })
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RunEvent) -> CoreStep {
        match event {
            RunEvent::TaskRequested { task } => handle_task_request(&mut self.scheduler, task),
            RunEvent::TaskCompleted { task, result } => {
                let outcome = TaskOutcome::from(&result);
                if let Err(err) = result {
                    error!(task = %task, run_id = self.run_id(), error = %err, "task failed");
                    if self.first_failure.is_none() {
                        self.first_failure = Some((task.clone(), err));
                    }
                }
                handle_task_completion(&mut self.scheduler, task, outcome)
            }
        }
    }

    /// Consume the core once the run is idle and report the target's result.
    ///
    /// A failure is wrapped as `TaskFailed { task: target }`; when the target
    /// was blocked by a failing prerequisite, the prerequisite's own
    /// `TaskFailed` sits underneath.
    pub fn finish(self) -> Result<()> {
        let state = self.scheduler.run_state_of(&self.target);
        if state == Some(TaskRunState::DoneSuccess) {
            info!(task = %self.target, run_id = self.scheduler.run_id(), "run succeeded");
            return Ok(());
        }

        let source = match self.first_failure {
            Some((task, err)) if task == self.target => err,
            Some((task, err)) => FlowError::TaskFailed {
                task,
                source: Box::new(err),
            },
            None => FlowError::Other(anyhow::anyhow!(
                "run ended with task '{}' in state {:?}",
                self.target,
                state
            )),
        };

        Err(FlowError::TaskFailed {
            task: self.target,
            source: Box::new(source),
        })
    }
}

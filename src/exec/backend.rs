// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The run loop talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `WorkExecutor` runs each scheduled task's [`TaskWork`] on its own Tokio
//!   task and reports the result back as `RunEvent::TaskCompleted`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits completion events.
//!
//! [`TaskWork`]: crate::dag::TaskWork

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{ScheduledTask, TaskContext};
use crate::engine::{RunEvent, Runner};
use crate::errors::{FlowError, Result};

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation must eventually emit exactly one
    /// `RunEvent::TaskCompleted` per task.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor backend used in production.
pub struct WorkExecutor {
    event_tx: mpsc::UnboundedSender<RunEvent>,
    runner: Runner,
}

impl WorkExecutor {
    pub fn new(event_tx: mpsc::UnboundedSender<RunEvent>, runner: Runner) -> Self {
        Self { event_tx, runner }
    }
}

impl ExecutorBackend for WorkExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let event_tx = self.event_tx.clone();
        let runner = self.runner.clone();

        Box::pin(async move {
            for task in tasks {
                let event_tx = event_tx.clone();
                let ctx = TaskContext::new(task.name.clone(), task.run_id, runner.clone());
                tokio::spawn(run_task(task, ctx, event_tx));
            }
            Ok(())
        })
    }
}

/// Run a single task's work and emit its `TaskCompleted` event.
///
/// The work runs in a nested Tokio task so a panic is reported as a failed
/// completion instead of leaving the run waiting forever.
async fn run_task(
    task: ScheduledTask,
    ctx: TaskContext,
    event_tx: mpsc::UnboundedSender<RunEvent>,
) {
    info!(task = %task.name, run_id = task.run_id, "starting task");

    let work = task.work;
    let handle = tokio::spawn(async move { work.run(ctx).await });
    let result = match handle.await {
        Ok(result) => result,
        Err(join_err) => {
            error!(task = %task.name, error = %join_err, "task work panicked");
            Err(FlowError::Other(anyhow::anyhow!(
                "task '{}' aborted: {join_err}",
                task.name
            )))
        }
    };

    debug!(task = %task.name, run_id = task.run_id, success = result.is_ok(), "task finished");

    if event_tx
        .send(RunEvent::TaskCompleted {
            task: task.name.clone(),
            result,
        })
        .is_err()
    {
        debug!(task = %task.name, "run loop already gone; dropping completion");
    }
}

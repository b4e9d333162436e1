// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::errors::{FlowError, Result};
use crate::exec::ExecutorBackend;

use super::core::RunCore;
use super::{CoreCommand, RunEvent};

/// Drives one run in response to `RunEvent`s, and delegates the actual
/// work to an `ExecutorBackend`.
///
/// This is a pure IO shell around `RunCore`, which contains all the
/// scheduling semantics.
pub struct RunLoop<E: ExecutorBackend> {
    core: RunCore,
    event_rx: mpsc::UnboundedReceiver<RunEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for RunLoop<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoop")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> RunLoop<E> {
    pub fn new(core: RunCore, event_rx: mpsc::UnboundedReceiver<RunEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Seeds the core with the target task.
    /// - Consumes `RunEvent`s until the core reports the run idle.
    /// - Dispatches newly ready tasks after every step.
    ///
    /// Returns the target's result as computed by [`RunCore::finish`].
    pub async fn run(mut self) -> Result<()> {
        debug!(task = %self.core.target(), run_id = self.core.run_id(), "run loop started");

        let mut step = self.core.start();
        loop {
            self.execute(step.commands).await?;
            if !step.keep_running {
                break;
            }

            let event = self.event_rx.recv().await.ok_or_else(|| {
                FlowError::Other(anyhow::anyhow!(
                    "run event channel closed before task '{}' finished",
                    self.core.target()
                ))
            })?;
            debug!(?event, "run loop received event");
            step = self.core.step(event);
        }

        self.core.finish()
    }

    async fn execute(&mut self, commands: Vec<CoreCommand>) -> Result<()> {
        for command in commands {
            match command {
                CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = self.core.run_id(), "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}


// src/engine/runner.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::{Scheduler, TaskGraph};
use crate::engine::{RunCore, RunLoop};
use crate::errors::{FlowError, Result};
use crate::exec::WorkExecutor;

/// Entry point for executing tasks: `run(name)`.
///
/// Cheap to clone; every clone shares the same graph and run counter. Each
/// call is an independent run, so asking for the same task twice executes
/// it twice.
#[derive(Clone)]
pub struct Runner {
    graph: Arc<TaskGraph>,
    run_counter: Arc<AtomicU64>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("tasks", &self.graph.len())
            .field("runs", &self.run_counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl Runner {
    pub fn new(graph: TaskGraph) -> Self {
        Self::from_shared(Arc::new(graph))
    }

    pub fn from_shared(graph: Arc<TaskGraph>) -> Self {
        Self {
            graph,
            run_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run `name` after all of its transitive prerequisites.
    ///
    /// Independent prerequisites run concurrently. Fails with
    /// [`FlowError::UnknownTask`] for unregistered names and with
    /// [`FlowError::TaskFailed`] when the task or one of its prerequisites
    /// fails. Work already in flight when a failure arrives is allowed to
    /// finish before this returns.
    pub async fn run(&self, name: &str) -> Result<()> {
        if !self.graph.contains(name) {
            return Err(FlowError::UnknownTask(name.to_string()));
        }

        let run_id = self.run_counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(task = %name, run_id, "starting run");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let executor = WorkExecutor::new(event_tx, self.clone());
        let core = RunCore::new(Scheduler::new(Arc::clone(&self.graph), run_id), name);

        RunLoop::new(core, event_rx, executor).run().await
    }
}

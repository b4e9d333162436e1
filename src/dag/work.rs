// src/dag/work.rs

//! The unit of work a task performs once its prerequisites are done.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::{Runner, TaskName};
use crate::errors::Result;

/// Boxed future returned by [`TaskWork::run`].
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Everything a running task gets to see about its invocation.
#[derive(Clone)]
pub struct TaskContext {
    pub task: TaskName,
    pub run_id: u64,
    runner: Runner,
}

impl TaskContext {
    pub fn new(task: TaskName, run_id: u64, runner: Runner) -> Self {
        Self {
            task,
            run_id,
            runner,
        }
    }

    /// Handle back into the runtime, for tasks that trigger further runs
    /// (the watch session does this on every file change).
    pub fn runner(&self) -> &Runner {
        &self.runner
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting what a task actually does.
///
/// Production tasks run pipelines or start servers; tests register closures
/// that record their invocation order.
pub trait TaskWork: Send + Sync {
    fn run<'a>(&'a self, ctx: TaskContext) -> WorkFuture<'a>;
}

/// Adapter turning an async closure into a [`TaskWork`].
pub struct FnWork<F>(F);

impl<F, Fut> TaskWork for FnWork<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run<'a>(&'a self, ctx: TaskContext) -> WorkFuture<'a> {
        Box::pin((self.0)(ctx))
    }
}

/// Wrap an async closure as shared task work.
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn TaskWork>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnWork(f))
}

struct Noop;

impl TaskWork for Noop {
    fn run<'a>(&'a self, _ctx: TaskContext) -> WorkFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Work for aggregate tasks that only exist to pull in prerequisites.
pub fn noop() -> Arc<dyn TaskWork> {
    Arc::new(Noop)
}

// src/pipeline/mod.rs

//! The front-end task set: linting, compiling, injecting, optimizing,
//! serving and watching, registered on one task graph.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::dag::{TaskContext, TaskWork, WorkFuture};
use crate::fs::FileSystem;
use crate::lint::LintCacheRegistry;
use crate::server::ReloadChannel;
use crate::session::Session;
use crate::transform::{Pipeline, PipelineEnv};

pub mod tasks;

pub use tasks::build_task_graph;

/// Shared collaborators handed to every task.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub fs: Arc<dyn FileSystem>,
    pub reload: ReloadChannel,
    pub session: Arc<Session>,
    pub lint_caches: Arc<LintCacheRegistry>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("root", &self.config.root())
            .field("reload_subscribers", &self.reload.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl Services {
    pub fn new(config: Arc<Config>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            fs,
            reload: ReloadChannel::new(),
            session: Arc::new(Session::new()),
            lint_caches: Arc::new(LintCacheRegistry::default()),
        }
    }

    pub fn env(&self) -> PipelineEnv {
        PipelineEnv::new(self.config.root(), Arc::clone(&self.fs))
    }
}

/// Task work that runs one file pipeline.
pub struct PipelineWork {
    pipeline: Pipeline,
    env: PipelineEnv,
}

impl PipelineWork {
    pub fn new(pipeline: Pipeline, env: PipelineEnv) -> Arc<dyn TaskWork> {
        Arc::new(Self { pipeline, env })
    }
}

impl TaskWork for PipelineWork {
    fn run<'a>(&'a self, _ctx: TaskContext) -> WorkFuture<'a> {
        Box::pin(async move {
            self.pipeline.run(&self.env).await?;
            Ok(())
        })
    }
}

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::config::{Config, RawConfig, WatchRuleConfig};
use assetflow::dag::{work_fn, TaskContext, TaskGraph, TaskGraphBuilder, TaskWork};
use assetflow::errors::{FlowError, Result};

/// Shared log of task invocations, in the order their work started.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| c == name)
    }

    /// Work that records its task name and succeeds.
    pub fn work(&self) -> Arc<dyn TaskWork> {
        let calls = Arc::clone(&self.calls);
        work_fn(move |ctx: TaskContext| {
            calls.lock().unwrap().push(ctx.task.clone());
            async { Ok::<_, FlowError>(()) }
        })
    }

    /// Work that records its task name, sleeps, then succeeds.
    pub fn slow_work(&self, delay: Duration) -> Arc<dyn TaskWork> {
        let calls = Arc::clone(&self.calls);
        work_fn(move |ctx: TaskContext| {
            calls.lock().unwrap().push(ctx.task.clone());
            async move {
                tokio::time::sleep(delay).await;
                Ok::<_, FlowError>(())
            }
        })
    }

    /// Work that records its task name and fails with a transform error.
    pub fn failing_work(&self, message: &str) -> Arc<dyn TaskWork> {
        let calls = Arc::clone(&self.calls);
        let message = message.to_string();
        work_fn(move |ctx: TaskContext| {
            calls.lock().unwrap().push(ctx.task.clone());
            let err = FlowError::transform(ctx.task.clone(), message.clone());
            async move { Err::<(), _>(err) }
        })
    }
}

/// Graph where every task records into `recorder`.
///
/// `tasks` is a list of `(name, prerequisites)`.
pub fn recorded_graph(recorder: &Recorder, tasks: &[(&str, &[&str])]) -> Result<TaskGraph> {
    let mut builder = TaskGraphBuilder::new();
    for (name, prerequisites) in tasks {
        builder.add(name, prerequisites.iter().copied(), recorder.work());
    }
    builder.build()
}

/// Builder for a validated `Config` rooted at a test directory.
pub struct ConfigBuilder {
    raw: RawConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfig::default(),
        }
    }

    /// Turn every external tool stage into a pass-through so pipelines run
    /// without the real toolchain.
    pub fn with_identity_tools(mut self) -> Self {
        self.raw.tools.sass = None;
        self.raw.tools.autoprefixer = None;
        self.raw.tools.css_minifier = None;
        self.raw.tools.js_minifier = None;
        self
    }

    pub fn css_minifier(mut self, cmd: &str) -> Self {
        self.raw.tools.css_minifier = Some(cmd.to_string());
        self
    }

    pub fn js_minifier(mut self, cmd: &str) -> Self {
        self.raw.tools.js_minifier = Some(cmd.to_string());
        self
    }

    pub fn style_lint_command(mut self, cmd: &str) -> Self {
        self.raw.lint.style_command = cmd.to_string();
        self
    }

    pub fn script_lint_command(mut self, cmd: &str) -> Self {
        self.raw.lint.script_command = cmd.to_string();
        self
    }

    pub fn index(mut self, path: &str) -> Self {
        self.raw.paths.index = path.to_string();
        self
    }

    pub fn no_browser(mut self) -> Self {
        self.raw.server.open_browser = false;
        self
    }

    pub fn ports(mut self, dev: u16, build: u16) -> Self {
        self.raw.server.dev_port = dev;
        self.raw.server.build_port = build;
        self
    }

    pub fn watch(mut self, pattern: &str, tasks: &[&str]) -> Self {
        self.raw
            .watch
            .get_or_insert_with(Vec::new)
            .push(WatchRuleConfig::new(pattern, tasks));
        self
    }

    pub fn build(self, root: &Path) -> Config {
        assetflow::config::validate_config(self.raw, root.to_path_buf())
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

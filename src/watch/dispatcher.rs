// src/watch/dispatcher.rs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::Runner;
use crate::watch::WatchRule;

/// Turns one filesystem event into task runs.
///
/// Each rule that matches at least one path of the event fires exactly once,
/// on its own tokio task, so a slow rule never delays another. Within a rule
/// the tasks run in the listed order and the first failure ends that
/// dispatch; the failure is logged and the watch session carries on.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    rules: Arc<Vec<WatchRule>>,
    runner: Runner,
}

impl Dispatcher {
    pub fn new(rules: Vec<WatchRule>, runner: Runner) -> Self {
        Self {
            rules: Arc::new(rules),
            runner,
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Dispatch an event whose root-relative paths are `paths`.
    pub fn dispatch<S: AsRef<str>>(&self, paths: &[S]) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for rule in self.rules.iter().filter(|r| r.matches_any(paths)) {
            let tasks = rule.tasks().to_vec();
            let runner = self.runner.clone();
            let pattern = rule.pattern().patterns().join(", ");
            debug!(pattern = %pattern, tasks = ?tasks, "watch rule matched");

            handles.push(tokio::spawn(async move {
                for task in &tasks {
                    info!(task = %task, pattern = %pattern, "change detected; running task");
                    if let Err(err) = runner.run(task).await {
                        error!(task = %task, pattern = %pattern, error = %err, "watched task failed");
                        break;
                    }
                }
            }));
        }
        handles
    }
}

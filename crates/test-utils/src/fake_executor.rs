use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use assetflow::dag::ScheduledTask;
use assetflow::engine::RunEvent;
use assetflow::exec::ExecutorBackend;
use assetflow::errors::{FlowError, Result};

/// A fake executor that:
/// - records which tasks were "run", batch by batch
/// - immediately reports completion for each scheduled task, failing the
///   ones named in `failing`.
pub struct FakeExecutor {
    event_tx: mpsc::UnboundedSender<RunEvent>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    failing: BTreeSet<String>,
}

impl FakeExecutor {
    pub fn new(
        event_tx: mpsc::UnboundedSender<RunEvent>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    ) -> Self {
        Self {
            event_tx,
            batches,
            failing: BTreeSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
            self.batches.lock().unwrap().push(names);

            for t in tasks {
                let result = if self.failing.contains(&t.name) {
                    Err(FlowError::transform(t.name.clone(), "fake failure"))
                } else {
                    Ok(())
                };
                self.event_tx
                    .send(RunEvent::TaskCompleted {
                        task: t.name.clone(),
                        result,
                    })
                    .map_err(|e| anyhow::anyhow!("run loop gone: {e}"))?;
            }
            Ok(())
        })
    }
}

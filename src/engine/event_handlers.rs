// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler};
use crate::engine::{TaskName, TaskOutcome};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
}

/// Decision returned by the core after handling a single `RunEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep waiting for events.
    pub keep_running: bool,
}

impl CoreStep {
    /// Names of every task this step dispatches, in dispatch order.
    pub fn dispatched_names(&self) -> Vec<TaskName> {
        self.commands
            .iter()
            .flat_map(|CoreCommand::DispatchTasks(tasks)| tasks.iter().map(|t| t.name.clone()))
            .collect()
    }

    fn from_ready(ready: Vec<ScheduledTask>, scheduler: &Scheduler) -> Self {
        let mut commands = Vec::new();
        if !ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(ready));
        }
        CoreStep {
            commands,
            keep_running: !scheduler.is_idle(),
        }
    }
}

/// Handle a request for a task: the task and everything it transitively
/// needs join the run, and whatever is ready gets dispatched.
pub fn handle_task_request(scheduler: &mut Scheduler, task: TaskName) -> CoreStep {
    let ready = scheduler.handle_request(&task);
    CoreStep::from_ready(ready, scheduler)
}

/// Handle a task completion event.
///
/// Success may unblock dependents; failure fails every pending dependent.
/// The loop keeps running while anything is still in flight, so siblings
/// that were already dispatched are awaited rather than abandoned.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let ready = scheduler.handle_completion(&task, outcome);
    CoreStep::from_ready(ready, scheduler)
}

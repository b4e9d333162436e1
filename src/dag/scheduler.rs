// src/dag/scheduler.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable graph plus the mutable state of one run.
///
/// It is responsible for:
/// - remembering which tasks take part in the run
/// - deciding when a task is ready (every prerequisite succeeded)
/// - failing dependents when a task fails
///
/// A scheduler is created per `Runner::run` call, so successes never leak
/// from one run into the next.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    tasks: BTreeMap<TaskName, TaskInfo>,
    run_id: u64,
    active: bool,
}

impl Scheduler {
    pub fn new(graph: Arc<TaskGraph>, run_id: u64) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let prerequisites = graph.prerequisites_of(name).map(str::to_string).collect();
                (name.to_string(), TaskInfo::new(name.to_string(), prerequisites))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_id,
            active: false,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Returns `true` if nothing is pending or running.
    pub fn is_idle(&self) -> bool {
        !self.active
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in this run, sorted.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the prerequisites of `task` are satisfied in this run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Request a task (production API).
    pub fn handle_request(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.request_step_internal(task).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_request` that returns a rich [`SchedulerStep`].
    pub fn step_request(&mut self, task: &str) -> SchedulerStep {
        self.request_step_internal(task)
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Mark the run finished if every participating task is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.run_id, "scheduler: all tasks terminal; run finished");
            self.active = false;
            true
        } else {
            false
        }
    }

    fn request_step_internal(&mut self, task: &str) -> SchedulerStep {
        if !self.tasks.contains_key(task) {
            warn!(task = %task, "request for unknown task; ignoring");
            return SchedulerStep::default();
        }

        if !self.active {
            debug!(run_id = self.run_id, task = %task, "scheduler: starting run");
            self.active = true;
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.run_id);
        manager.mark_task_and_prerequisites_pending(task);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        if !self.active {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        }

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();
        let run_id = self.run_id;

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                }
                TaskOutcome::Failed => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(task = %info.name, run_id, "task failed; failing dependents in this run");
                    newly_failed.push(info.name.clone());
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
                    newly_failed.append(&mut manager.mark_dependents_failed(task));
                }
            },
            Some(info) => {
                warn!(
                    task = %info.name,
                    state = ?info.run_state,
                    "completion for a task that is not running; ignoring"
                );
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}

// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::dag::TaskGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
        run_id: u64,
    ) -> Self {
        Self {
            graph,
            tasks,
            run_id,
        }
    }

    /// Include a requested task and all its transitive prerequisites in this
    /// run.
    ///
    /// Tasks already participating keep their current state, so a shared
    /// prerequisite is only ever scheduled once per run.
    pub fn mark_task_and_prerequisites_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: BTreeSet<TaskName> = BTreeSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, run_id = self.run_id, "marked Pending for this run");
                }
                stack.extend(info.prerequisites.iter().cloned());
            } else {
                warn!(task = %name, "node in task graph not present in tasks map");
            }
        }
    }

    /// Whether every prerequisite of `info` completed successfully in this
    /// run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark all participating dependents (transitively) of a failed task as
    /// `DoneFailed` for this run.
    ///
    /// Returns the newly failed tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.run_state {
                    Some(RunState::Pending) => {
                        info.run_state = Some(RunState::DoneFailed);
                        debug!(
                            task = %info.name,
                            upstream = %failed_task,
                            "marking dependent as DoneFailed due to upstream failure"
                        );
                        newly_failed.push(info.name.clone());
                        stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    }
                    // A running dependent cannot exist: it only starts once
                    // every prerequisite succeeded.
                    Some(RunState::Running)
                    | Some(RunState::DoneSuccess)
                    | Some(RunState::DoneFailed)
                    | None => {}
                }
            }
        }

        newly_failed
    }

    /// Collect `Pending` tasks whose prerequisites are satisfied, mark them
    /// `Running` and return them for dispatch.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            let Some(work) = self.graph.work_of(&name) else {
                warn!(task = %name, "ready task has no registered work; skipping");
                continue;
            };
            if let Some(info) = self.tasks.get_mut(&name) {
                debug!(
                    task = %info.name,
                    run_id = self.run_id,
                    "prerequisites satisfied; marking Running"
                );
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask {
                    name,
                    work,
                    run_id: self.run_id,
                });
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view used when only shared access to the tasks map exists
/// (e.g. in `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Prerequisites count only when they succeeded in the *current* run;
    /// nothing carries over from earlier runs.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.prerequisites.iter().all(|dep_name| {
            match self.tasks.get(dep_name) {
                Some(dep) => matches!(dep.run_state, Some(RunState::DoneSuccess)),
                None => {
                    warn!(
                        task = %info.name,
                        dep = %dep_name,
                        "prerequisite missing from tasks map"
                    );
                    false
                }
            }
        })
    }
}

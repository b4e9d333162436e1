// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`builder`] validates registrations into an immutable [`TaskGraph`].
//! - [`graph`] holds prerequisites, dependents and the work of every task.
//! - [`work`] defines what a task does when it runs.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod builder;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;
pub mod work;

pub use builder::TaskGraphBuilder;
pub use graph::TaskGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
pub use work::{TaskContext, TaskWork, WorkFuture, noop, work_fn};

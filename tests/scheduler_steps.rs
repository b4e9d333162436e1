// tests/scheduler_steps.rs

use std::sync::Arc;

use assetflow::dag::{Scheduler, TaskRunState};
use assetflow::engine::TaskOutcome;
use assetflow_test_utils::builders::{recorded_graph, Recorder};

const NONE: &[&str] = &[];

fn scheduler() -> Scheduler {
    let graph = recorded_graph(
        &Recorder::new(),
        &[
            ("optimize", &["inject"]),
            ("inject", &["compile-sass", "compile-js"]),
            ("compile-sass", NONE),
            ("compile-js", NONE),
            ("fonts", NONE),
        ],
    )
    .unwrap();
    Scheduler::new(Arc::new(graph), 7)
}

fn names(step: &assetflow::dag::SchedulerStep) -> Vec<&str> {
    step.newly_scheduled.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn only_the_closure_takes_part_in_a_run() {
    let mut scheduler = scheduler();
    let step = scheduler.step_request("optimize");

    assert_eq!(names(&step), vec!["compile-js", "compile-sass"]);
    assert_eq!(scheduler.run_state_of("fonts"), Some(TaskRunState::NotInRun));
    assert_eq!(scheduler.run_state_of("optimize"), Some(TaskRunState::Pending));
    assert_eq!(
        scheduler.tasks_in_current_run(),
        vec!["compile-js", "compile-sass", "inject", "optimize"]
    );
    assert!(step.newly_scheduled.iter().all(|t| t.run_id == 7));
}

#[test]
fn dependent_waits_for_every_prerequisite() {
    let mut scheduler = scheduler();
    scheduler.step_request("inject");

    let step = scheduler.step_completion("compile-sass", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.deps_satisfied("inject"), Some(false));

    let step = scheduler.step_completion("compile-js", TaskOutcome::Success);
    assert_eq!(names(&step), vec!["inject"]);

    let step = scheduler.step_completion("inject", TaskOutcome::Success);
    assert!(step.run_just_finished);
    assert!(scheduler.is_idle());
}

#[test]
fn failure_marks_transitive_dependents_failed() {
    let mut scheduler = scheduler();
    scheduler.step_request("optimize");

    let step = scheduler.step_completion("compile-js", TaskOutcome::Failed);
    assert_eq!(step.newly_failed, vec!["compile-js", "inject", "optimize"]);
    assert!(!step.run_just_finished, "compile-sass is still running");

    let step = scheduler.step_completion("compile-sass", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert_eq!(scheduler.run_state_of("optimize"), Some(TaskRunState::DoneFailed));
}

#[test]
fn stray_completion_is_ignored() {
    let mut scheduler = scheduler();
    scheduler.step_request("compile-sass");

    let step = scheduler.step_completion("fonts", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.run_state_of("fonts"), Some(TaskRunState::NotInRun));
}

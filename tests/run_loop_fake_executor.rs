// tests/run_loop_fake_executor.rs

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetflow::dag::Scheduler;
use assetflow::engine::{RunCore, RunLoop};
use assetflow::errors::FlowError;
use assetflow_test_utils::builders::{recorded_graph, Recorder};
use assetflow_test_utils::fake_executor::FakeExecutor;
use assetflow_test_utils::with_timeout;

const NONE: &[&str] = &[];

fn diamond() -> Arc<assetflow::dag::TaskGraph> {
    let graph = recorded_graph(
        &Recorder::new(),
        &[
            ("inject", &["insert-dependencies", "compile-sass", "compile-js"]),
            ("insert-dependencies", NONE),
            ("compile-sass", &["lint-sass"]),
            ("compile-js", &["lint-js"]),
            ("lint-sass", NONE),
            ("lint-js", NONE),
        ],
    )
    .unwrap();
    Arc::new(graph)
}

#[tokio::test]
async fn dispatches_in_waves() {
    let (tx, rx) = mpsc::unbounded_channel();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx, Arc::clone(&batches));
    let core = RunCore::new(Scheduler::new(diamond(), 1), "inject");

    with_timeout(RunLoop::new(core, rx, executor).run())
        .await
        .unwrap();

    let batches = batches.lock().unwrap().clone();
    assert_eq!(
        batches[0],
        vec!["insert-dependencies", "lint-js", "lint-sass"],
        "every task without prerequisites starts in the first wave"
    );
    let flat: Vec<String> = batches.into_iter().flatten().collect();
    assert_eq!(flat.len(), 6);
    assert_eq!(flat.last().map(String::as_str), Some("inject"));
}

#[tokio::test]
async fn failure_skips_dependents() {
    let (tx, rx) = mpsc::unbounded_channel();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx, Arc::clone(&batches)).failing("lint-js");
    let core = RunCore::new(Scheduler::new(diamond(), 1), "inject");

    let err = with_timeout(RunLoop::new(core, rx, executor).run())
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::TaskFailed { ref task, .. } if task == "inject"));
    let flat: Vec<String> = batches.lock().unwrap().iter().flatten().cloned().collect();
    assert!(!flat.contains(&"compile-js".to_string()));
    assert!(!flat.contains(&"inject".to_string()));
    assert!(flat.contains(&"compile-sass".to_string()));
}

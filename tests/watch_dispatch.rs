// tests/watch_dispatch.rs

use std::time::Duration;

use assetflow::config::WatchRuleConfig;
use assetflow::dag::TaskGraphBuilder;
use assetflow::engine::Runner;
use assetflow::watch::{compile_rules, spawn_watcher, Dispatcher};
use assetflow_test_utils::builders::Recorder;
use assetflow_test_utils::{init_tracing, with_timeout};

const NONE: [&str; 0] = [];

fn runner(recorder: &Recorder) -> Runner {
    let graph = TaskGraphBuilder::new()
        .register("lint-sass", NONE, recorder.work())
        .register("compile-sass", ["lint-sass"], recorder.work())
        .register("compile-js", NONE, recorder.failing_work("syntax error"))
        .register("reload", NONE, recorder.work())
        .build()
        .unwrap();
    Runner::new(graph)
}

fn dispatcher(recorder: &Recorder, rules: &[WatchRuleConfig]) -> Dispatcher {
    let runner = runner(recorder);
    let rules = compile_rules(rules, runner.graph()).unwrap();
    Dispatcher::new(rules, runner)
}

async fn join(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn one_invocation_per_event() {
    init_tracing();
    let recorder = Recorder::new();
    let dispatcher = dispatcher(
        &recorder,
        &[WatchRuleConfig::new("src/sass/**/*.scss", &["compile-sass"])],
    );

    let handles = dispatcher.dispatch(&["src/sass/main.scss", "src/sass/partials/_grid.scss"]);
    assert_eq!(handles.len(), 1);
    with_timeout(join(handles)).await;

    assert_eq!(recorder.count("compile-sass"), 1);
    assert_eq!(recorder.calls(), vec!["lint-sass", "compile-sass"]);
}

#[tokio::test]
async fn unmatched_paths_trigger_nothing() {
    let recorder = Recorder::new();
    let dispatcher = dispatcher(
        &recorder,
        &[WatchRuleConfig::new("src/sass/**/*.scss", &["compile-sass"])],
    );

    let handles = dispatcher.dispatch(&["src/scripts/app.js", "README.md"]);
    assert!(handles.is_empty());
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn rules_fire_independently_and_stop_at_the_first_failure() {
    let recorder = Recorder::new();
    let dispatcher = dispatcher(
        &recorder,
        &[
            WatchRuleConfig::new("src/**/*.js", &["compile-js", "reload"]),
            WatchRuleConfig::new("src/**/*", &["reload"]),
        ],
    );

    let handles = dispatcher.dispatch(&["src/scripts/app.js"]);
    assert_eq!(handles.len(), 2);
    with_timeout(join(handles)).await;

    // The first rule stops after compile-js fails; only the second reloads.
    assert_eq!(recorder.count("compile-js"), 1);
    assert_eq!(recorder.count("reload"), 1);
}

#[tokio::test]
async fn file_change_on_disk_runs_the_rule() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/sass")).unwrap();

    let recorder = Recorder::new();
    let dispatcher = dispatcher(
        &recorder,
        &[WatchRuleConfig::new("src/sass/**/*.scss", &["compile-sass"])],
    );
    let _handle = spawn_watcher(dir.path(), dispatcher).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(dir.path().join("src/sass/main.scss"), "a { }").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    with_timeout(async {
        while recorder.count("compile-sass") == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(recorder.calls().iter().all(|c| c == "lint-sass" || c == "compile-sass"));
}

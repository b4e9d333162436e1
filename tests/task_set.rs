// tests/task_set.rs
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetflow::config::Config;
use assetflow::engine::Runner;
use assetflow::errors::FlowError;
use assetflow::fs::RealFileSystem;
use assetflow::optimize::Manifest;
use assetflow::pipeline::{build_task_graph, Services};
use assetflow_test_utils::builders::ConfigBuilder;
use assetflow_test_utils::{init_tracing, with_timeout};

const INDEX: &str = r#"<html>
<head>
    <!-- build:css _assets/css/app.css -->
    <!-- bower:css -->
    <!-- endbower -->
    <!-- inject:css -->
    <!-- endinject -->
    <!-- endbuild -->
</head>
<body>
    <!-- build:js _assets/js/app.js -->
    <!-- inject:js -->
    <!-- endinject -->
    <!-- endbuild -->
</body>
</html>
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/index.html", INDEX);
    write(root, "bower.json", "{}");
    write(root, "src/sass/main.scss", "body { color: red }");
    write(root, "src/scripts/a.js", "var a;");
    write(root, "src/scripts/b.js", "var b;");
    write(root, "src/fonts/icons.woff", "woff");
    write(root, "src/images/logo.svg", "<svg/>");
    dir
}

fn config(root: &Path, builder: ConfigBuilder) -> Arc<Config> {
    Arc::new(
        builder
            .with_identity_tools()
            .style_lint_command("true")
            .script_lint_command("true")
            .no_browser()
            .build(root),
    )
}

fn runner(config: Arc<Config>) -> (Services, Runner) {
    let services = Services::new(config, Arc::new(RealFileSystem));
    let graph = build_task_graph(&services).unwrap();
    (services, Runner::new(graph))
}

#[test]
fn every_task_is_registered_with_its_prerequisites() {
    let dir = project();
    let (_services, runner) = runner(config(dir.path(), ConfigBuilder::new()));
    let graph = runner.graph();

    let prerequisites = |task: &str| graph.prerequisites_of(task).collect::<Vec<_>>();
    assert_eq!(prerequisites("compile-sass"), vec!["lint-sass"]);
    assert_eq!(prerequisites("compile-js"), vec!["lint-js"]);
    assert_eq!(
        prerequisites("inject"),
        vec!["compile-js", "compile-sass", "insert-dependencies"]
    );
    assert_eq!(prerequisites("optimize"), vec!["inject"]);
    assert_eq!(prerequisites("open-dev"), vec!["connect-dev", "inject"]);
    assert_eq!(prerequisites("open-build"), vec!["connect", "optimize"]);
    assert_eq!(
        prerequisites("default"),
        vec!["fonts", "images", "open-dev", "watch"]
    );
    assert_eq!(
        prerequisites("build"),
        vec!["fonts", "images", "open-build", "watch"]
    );
    for task in ["reload", "clean-assets", "connect", "connect-dev", "insert-dependencies"] {
        assert!(graph.contains(task), "{task} missing");
    }
}

#[tokio::test]
async fn compile_js_concatenates_into_the_assets_dir() {
    init_tracing();
    let dir = project();
    let (services, runner) = runner(config(dir.path(), ConfigBuilder::new()));
    let mut reloads = services.reload.subscribe();

    with_timeout(runner.run("compile-js")).await.unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("_assets/js/bundle.js")).unwrap(),
        "var a;\nvar b;"
    );
    assert!(reloads.try_recv().is_ok());
}

#[tokio::test]
async fn lint_failure_stops_compilation() {
    let dir = project();
    let (_services, runner) = runner(config(
        dir.path(),
        ConfigBuilder::new().script_lint_command("echo 'no-undef' && false"),
    ));

    let err = with_timeout(runner.run("compile-js")).await.unwrap_err();

    assert!(matches!(err.root_cause(), FlowError::LintViolation { .. }), "got {err:?}");
    assert!(!dir.path().join("_assets/js/bundle.js").exists());
}

#[tokio::test]
async fn optimize_builds_from_the_injected_index() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    let (_services, runner) = runner(config(root, ConfigBuilder::new()));

    with_timeout(runner.run("optimize")).await.unwrap();

    let injected = fs::read_to_string(root.join("src/index.html")).unwrap();
    assert!(injected.contains(r#"<script src="/_assets/js/bundle.js"></script>"#));

    let manifest = Manifest::from_json(
        &fs::read_to_string(root.join("build/rev-manifest.json")).unwrap(),
    )
    .unwrap();
    let css = manifest.get("_assets/css/app.css").unwrap();
    assert_eq!(
        fs::read_to_string(root.join("build").join(css)).unwrap(),
        "body { color: red }"
    );
    let js = manifest.get("_assets/js/app.js").unwrap();
    assert_eq!(
        fs::read_to_string(root.join("build").join(js)).unwrap(),
        "var a;\nvar b;"
    );
    assert!(manifest.get("index.html").is_some());
}

#[tokio::test]
async fn fonts_images_and_clean_assets() {
    let dir = project();
    let root = dir.path();
    let (_services, runner) = runner(config(root, ConfigBuilder::new()));

    runner.run("fonts").await.unwrap();
    runner.run("images").await.unwrap();
    assert_eq!(fs::read_to_string(root.join("_assets/fonts/icons.woff")).unwrap(), "woff");
    assert_eq!(fs::read_to_string(root.join("_assets/img/logo.svg")).unwrap(), "<svg/>");

    runner.run("clean-assets").await.unwrap();
    assert!(!root.join("_assets/fonts/icons.woff").exists());
    assert!(!root.join("_assets/img/logo.svg").exists());
}

#[tokio::test]
async fn watch_rejects_rules_naming_unknown_tasks() {
    let dir = project();
    let (services, runner) = runner(config(
        dir.path(),
        ConfigBuilder::new().watch("src/**/*.txt", &["no-such-task"]),
    ));

    let err = runner.run("watch").await.unwrap_err();

    assert!(err.root_cause().is_configuration(), "got {err:?}");
    assert!(!services.session.keeps_alive());
}

#[tokio::test]
async fn connect_starts_one_server_per_task() {
    let dir = project();
    let (services, runner) = runner(config(dir.path(), ConfigBuilder::new().ports(47811, 47812)));

    runner.run("connect-dev").await.unwrap();
    runner.run("connect-dev").await.unwrap();

    assert!(services.session.has_server("connect-dev"));
    assert_eq!(
        services.session.server_addr("connect-dev").map(|a| a.port()),
        Some(47811)
    );
    services.session.shutdown();
}

#[tokio::test]
async fn open_build_finds_the_revisioned_index_through_the_manifest() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    let (services, runner) = runner(config(
        root,
        ConfigBuilder::new().index("./index.html").ports(47821, 47822),
    ));

    with_timeout(runner.run("optimize")).await.unwrap();
    let result = with_timeout(runner.run("open-build")).await;
    let serving = services.session.server_addr("connect").map(|a| a.port());
    services.session.shutdown();
    result.unwrap();
    assert_eq!(serving, Some(47822));

    let manifest = Manifest::from_json(
        &fs::read_to_string(root.join("build/rev-manifest.json")).unwrap(),
    )
    .unwrap();
    let index = manifest.get("index.html").unwrap();
    assert!(root.join("build").join(index).is_file());
}

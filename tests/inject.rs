// tests/inject.rs

use std::path::Path;
use std::sync::Arc;

use assetflow::errors::FlowError;
use assetflow::fs::mock::MockFileSystem;
use assetflow::inject::Injector;
use assetflow_test_utils::builders::ConfigBuilder;

const INDEX: &str = "<html>
<head>
    <!-- bower:css -->
    <!-- endbower -->
    <!-- inject:css -->
    <!-- endinject -->
</head>
<body>
    <!-- bower:js -->
    <!-- endbower -->
    <!-- inject:js -->
    <link rel=\"stale\">
    <!-- endinject -->
</body>
</html>
";

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/index.html", INDEX);
    fs.add_file(
        "/p/bower.json",
        r#"{ "dependencies": { "normalize-css": "^3", "jquery": "^2" } }"#,
    );
    fs.add_file(
        "/p/bower_components/normalize-css/bower.json",
        r#"{ "main": "normalize.css" }"#,
    );
    fs.add_file("/p/bower_components/normalize-css/normalize.css", "");
    fs.add_file("/p/bower_components/jquery/bower.json", r#"{ "main": ["dist/jquery.js"] }"#);
    fs.add_file("/p/bower_components/jquery/dist/jquery.js", "");
    fs.add_file("/p/_assets/css/bundle.css", "body{}");
    fs.add_file("/p/_assets/js/bundle.js", "var a;");
    fs
}

fn injector(fs: &MockFileSystem) -> Injector {
    let config = ConfigBuilder::new().build(Path::new("/p"));
    Injector::new(Arc::new(config), Arc::new(fs.clone()))
}

#[test]
fn third_party_packages_are_injected_relative_to_the_server_root() {
    let fs = project();
    injector(&fs).insert_dependencies().unwrap();

    let html = fs.contents("/p/src/index.html").unwrap();
    assert!(html.contains(
        "    <!-- bower:css -->\n    <link rel=\"stylesheet\" href=\"/bower_components/normalize-css/normalize.css\">\n    <!-- endbower -->"
    ));
    assert!(html.contains(
        "    <script src=\"/bower_components/jquery/dist/jquery.js\"></script>\n    <!-- endbower -->"
    ));
}

#[test]
fn local_bundles_replace_previous_content() {
    let fs = project();
    let injector = injector(&fs);
    injector.inject_bundles().unwrap();

    let html = fs.contents("/p/src/index.html").unwrap();
    assert!(html.contains("<link rel=\"stylesheet\" href=\"/_assets/css/bundle.css\">"));
    assert!(html.contains("<script src=\"/_assets/js/bundle.js\"></script>"));
    assert!(!html.contains("stale"));
}

#[test]
fn injection_is_idempotent() {
    let fs = project();
    let injector = injector(&fs);

    injector.insert_dependencies().unwrap();
    injector.inject_bundles().unwrap();
    let first = fs.contents("/p/src/index.html").unwrap();

    injector.insert_dependencies().unwrap();
    injector.inject_bundles().unwrap();
    assert_eq!(fs.contents("/p/src/index.html").unwrap(), first);
}

#[test]
fn missing_package_manifest_fails_the_task() {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/index.html", INDEX);

    let err = injector(&fs).insert_dependencies().unwrap_err();
    assert!(matches!(err, FlowError::Filesystem { .. } | FlowError::IoError(_)), "got {err:?}");
}

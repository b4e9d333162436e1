// tests/lint_cache.rs

use std::sync::{Arc, Mutex};

use assetflow::errors::FlowError;
use assetflow::fs::mock::MockFileSystem;
use assetflow::lint::{LintCacheRegistry, LintFuture, LintGate, Linter};
use assetflow::transform::{Asset, Pipeline, PipelineEnv, Source};

/// Records every batch it is asked to check; rejects files containing
/// `FAIL`.
#[derive(Default, Clone)]
struct FakeLinter {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeLinter {
    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl Linter for FakeLinter {
    fn name(&self) -> &str {
        "fake-lint"
    }

    fn lint<'a>(&'a self, _env: &'a PipelineEnv, files: &'a [Asset]) -> LintFuture<'a> {
        Box::pin(async move {
            let names = files
                .iter()
                .map(|f| f.origin.to_string_lossy().into_owned())
                .collect();
            self.batches.lock().unwrap().push(names);
            if files.iter().any(|f| f.contents.windows(4).any(|w| w == b"FAIL")) {
                return Err(FlowError::LintViolation {
                    linter: "fake-lint".to_string(),
                    diagnostics: "found FAIL".to_string(),
                });
            }
            Ok(())
        })
    }
}

fn setup() -> (MockFileSystem, PipelineEnv, FakeLinter, Pipeline) {
    let fs = MockFileSystem::new();
    fs.add_file("/project/src/sass/a.scss", "a {}");
    fs.add_file("/project/src/sass/b.scss", "b {}");
    fs.add_file("/project/src/sass/vendor/x.scss", "FAIL");
    let env = PipelineEnv::new("/project", Arc::new(fs.clone()));

    let registry = LintCacheRegistry::default();
    let linter = FakeLinter::default();
    let pipeline = Pipeline::builder(
        "lint-sass",
        Source::new(&["src/sass/**/*.scss", "!src/sass/vendor/**/*.scss"]).unwrap(),
    )
    .stage(LintGate::new(
        registry.register("lint-sass").unwrap(),
        Arc::new(linter.clone()),
    ))
    .build()
    .unwrap();

    (fs, env, linter, pipeline)
}

#[tokio::test]
async fn unchanged_files_are_skipped_on_the_second_pass() {
    let (_fs, env, linter, pipeline) = setup();

    pipeline.run(&env).await.unwrap();
    pipeline.run(&env).await.unwrap();

    assert_eq!(
        linter.batches(),
        vec![vec!["src/sass/a.scss".to_string(), "src/sass/b.scss".to_string()]]
    );
}

#[tokio::test]
async fn modified_file_is_linted_again() {
    let (fs, env, linter, pipeline) = setup();

    pipeline.run(&env).await.unwrap();
    fs.add_file("/project/src/sass/b.scss", "b { color: red }");
    pipeline.run(&env).await.unwrap();

    assert_eq!(linter.batches().len(), 2);
    assert_eq!(linter.batches()[1], vec!["src/sass/b.scss".to_string()]);
}

#[tokio::test]
async fn failing_pass_does_not_validate_its_files() {
    let (fs, env, linter, pipeline) = setup();

    fs.add_file("/project/src/sass/b.scss", "FAIL");
    let err = pipeline.run(&env).await.unwrap_err();
    assert!(matches!(err, FlowError::LintViolation { .. }));

    fs.add_file("/project/src/sass/b.scss", "b {}");
    pipeline.run(&env).await.unwrap();

    // Both files come back: nothing from the failed batch was marked valid.
    assert_eq!(
        linter.batches()[1],
        vec!["src/sass/a.scss".to_string(), "src/sass/b.scss".to_string()]
    );
}

#[test]
fn cache_keys_cannot_collide() {
    let registry = LintCacheRegistry::default();
    registry.register("lint-sass").unwrap();
    registry.register("lint-js").unwrap();

    let err = registry.register("lint-sass").unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn lint_gate_after_concat_is_rejected() {
    let registry = LintCacheRegistry::default();
    let err = Pipeline::builder("compile-sass", Source::glob("src/sass/**/*.scss").unwrap())
        .stage(assetflow::transform::Concat::new("bundle.css"))
        .stage(LintGate::new(
            registry.register("lint-sass").unwrap(),
            Arc::new(FakeLinter::default()),
        ))
        .build()
        .unwrap_err();

    assert!(err.is_configuration());
}

// src/lint/gate.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::lint::cache::LintCache;
use crate::lint::linter::Linter;
use crate::transform::{Asset, PipelineEnv, Transform, TransformFuture};

/// Pipeline stage that lints only files changed since their last successful
/// lint, then passes every asset downstream.
///
/// Files are marked validated only when the linter passes, so a failing
/// batch is linted again in full on the next run.
#[derive(Clone)]
pub struct LintGate {
    cache: LintCache,
    linter: Arc<dyn Linter>,
}

impl LintGate {
    pub fn new(cache: LintCache, linter: Arc<dyn Linter>) -> Self {
        Self { cache, linter }
    }

    pub fn cache(&self) -> &LintCache {
        &self.cache
    }

    /// Split assets into (unchanged and validated, new or changed).
    pub fn partition<'a>(&self, assets: &'a [Asset]) -> (Vec<&'a Asset>, Vec<&'a Asset>) {
        assets
            .iter()
            .partition(|a| self.cache.is_validated(&a.origin, &a.contents))
    }
}

impl std::fmt::Debug for LintGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LintGate")
            .field("cache", &self.cache.key())
            .field("linter", &self.linter.name())
            .finish()
    }
}

impl Transform for LintGate {
    fn name(&self) -> &str {
        self.linter.name()
    }

    fn keyed_per_file(&self) -> bool {
        true
    }

    fn apply<'a>(&'a self, env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a> {
        Box::pin(async move {
            let (skipped, changed) = self.partition(&assets);
            debug!(
                cache = %self.cache.key(),
                skipped = skipped.len(),
                changed = changed.len(),
                "lint cache partitioned inputs"
            );

            if !changed.is_empty() {
                let batch: Vec<Asset> = changed.into_iter().cloned().collect();
                self.linter.lint(env, &batch).await?;
                self.cache
                    .mark_validated(batch.iter().map(|a| (a.origin.as_path(), a.contents.as_slice())));
                info!(linter = %self.linter.name(), files = batch.len(), "lint passed");
            }

            Ok(assets)
        })
    }
}

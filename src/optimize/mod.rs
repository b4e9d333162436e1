// src/optimize/mod.rs

//! Production build of the entry HTML.
//!
//! Every build block in the index is concatenated and minified into its
//! target, the outputs get content-hashed names, the HTML references are
//! rewritten to those names and the HTML itself is revisioned last. The run
//! is all-or-nothing: nothing touches the build directory until every
//! output has been computed in memory.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{FlowError, Result};
use crate::fs::FileSystem;
use crate::transform::source::slash_path;
use crate::transform::{ExternalCommand, PipelineEnv};

pub mod blocks;
pub mod manifest;
pub mod rev;

pub use blocks::{parse_blocks, replace_blocks, BlockKind, BuildBlock};
pub use manifest::Manifest;
pub use rev::{content_hash, revision_path, rewrite_references};

/// Which minifier a build block goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Css,
    Library,
    Application,
    /// Concatenated but not minified.
    Plain,
}

/// What a finished optimize run did.
#[derive(Debug, Clone, Default)]
pub struct OptimizeReport {
    pub manifest: Manifest,
    /// Absolute paths written, manifest included.
    pub written: Vec<PathBuf>,
    /// Absolute paths of stale outputs that were removed.
    pub deleted: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    config: Arc<Config>,
    fs: Arc<dyn FileSystem>,
}

impl Optimizer {
    pub fn new(config: Arc<Config>, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }

    pub fn classify(&self, block: &BuildBlock) -> Stream {
        match block.kind {
            BlockKind::Css => Stream::Css,
            BlockKind::Remove => Stream::Plain,
            BlockKind::Js => {
                let file = Path::new(&block.target)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if file == self.config.optimize.library_bundle {
                    Stream::Library
                } else if file == self.config.optimize.application_bundle {
                    Stream::Application
                } else {
                    Stream::Plain
                }
            }
        }
    }

    fn minifier(&self, stream: Stream) -> ExternalCommand {
        let tools = &self.config.tools;
        match stream {
            Stream::Css => ExternalCommand::new("minify-css", tools.css_minifier.clone()),
            Stream::Library => ExternalCommand::new("minify-lib", tools.js_minifier.clone()),
            Stream::Application => ExternalCommand::new("minify-app", tools.js_minifier.clone()),
            Stream::Plain => ExternalCommand::new("concat", None),
        }
    }

    pub async fn run(&self) -> Result<OptimizeReport> {
        let index = self.config.index_path();
        let html = self.fs.read_to_string(&index)?;
        let blocks = parse_blocks(&html)?;
        info!(index = %index.display(), blocks = blocks.len(), "optimizing build blocks");

        let env = PipelineEnv::new(self.config.root(), Arc::clone(&self.fs));
        let mut next = Manifest::new();
        let mut outputs: Vec<(String, Vec<u8>)> = Vec::new();

        for block in blocks.iter().filter(|b| b.kind != BlockKind::Remove) {
            let stream = self.classify(block);
            let mut parts = Vec::with_capacity(block.references.len());
            for reference in &block.references {
                let Some(path) = self.resolve_reference(block, reference)? else {
                    continue;
                };
                parts.push(self.fs.read(&path)?);
            }
            let joined = parts.join(&b'\n');
            let minified = self
                .minifier(stream)
                .process(&env, &block.target, &joined)
                .await?;

            let target = clean_target(&block.target)?;
            let revisioned = revision_path(&target, &minified);
            debug!(target = %target, revisioned = %revisioned, stream = ?stream, "bundle ready");
            next.insert(target, revisioned.clone());
            outputs.push((revisioned, minified));
        }

        let html = replace_blocks(&html, &blocks);
        let html = rewrite_references(&html, next.entries())?;
        let index_key = self.config.index_key().to_string();
        let index_rev = revision_path(&index_key, html.as_bytes());
        next.insert(index_key, index_rev.clone());
        outputs.push((index_rev, html.into_bytes()));

        self.commit(next, outputs)
    }

    /// Write outputs, then the manifest, then remove what the previous
    /// manifest produced and the new one does not.
    fn commit(&self, next: Manifest, outputs: Vec<(String, Vec<u8>)>) -> Result<OptimizeReport> {
        let build_dir = self.config.build_dir();
        let manifest_path = self.config.manifest_path();
        let previous = Manifest::load(self.fs.as_ref(), &manifest_path)?;

        let mut written = Vec::with_capacity(outputs.len() + 1);
        for (relative, contents) in &outputs {
            let path = build_dir.join(relative);
            self.fs.write(&path, contents)?;
            written.push(path);
        }
        next.save(self.fs.as_ref(), &manifest_path)?;
        written.push(manifest_path);

        let mut deleted = Vec::new();
        if let Some(previous) = previous {
            for stale in previous.stale_entries(&next) {
                let Ok(relative) = clean_target(&stale) else {
                    warn!(entry = %stale, "refusing to delete manifest entry outside the build directory");
                    continue;
                };
                let path = build_dir.join(relative);
                if self.fs.is_file(&path) {
                    self.fs.remove_file(&path)?;
                    debug!(path = %path.display(), "removed stale output");
                    deleted.push(path);
                }
            }
        }

        info!(
            written = written.len(),
            deleted = deleted.len(),
            build = %build_dir.display(),
            "optimize finished"
        );
        Ok(OptimizeReport {
            manifest: next,
            written,
            deleted,
        })
    }

    /// Find the file a block reference points at: project root first, then
    /// the block's alternate search path, then the index directory.
    ///
    /// External URLs are skipped with a warning.
    fn resolve_reference(&self, block: &BuildBlock, reference: &str) -> Result<Option<PathBuf>> {
        if reference.starts_with("//") || reference.contains("://") {
            warn!(reference = %reference, target = %block.target, "external reference in build block skipped");
            return Ok(None);
        }
        let relative = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference)
            .trim_start_matches('/');

        let root = self.config.root();
        let mut candidates = vec![root.join(relative)];
        if let Some(alt) = &block.alternate_search_path {
            candidates.push(root.join(alt).join(relative));
        }
        let index_dir = self
            .config
            .index_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        candidates.push(index_dir.join(relative));

        candidates
            .into_iter()
            .find(|c| self.fs.is_file(c))
            .map(Some)
            .ok_or_else(|| {
                FlowError::transform(
                    "optimize",
                    format!("'{reference}' referenced by build block '{}' not found", block.target),
                )
            })
    }
}

/// Normalise a build-relative output path and reject anything that could
/// escape the build directory.
fn clean_target(target: &str) -> Result<String> {
    let path = Path::new(target.trim_start_matches('/'));
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(FlowError::transform(
                    "optimize",
                    format!("output path '{target}' leaves the build directory"),
                ));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(FlowError::transform("optimize", "empty output path"));
    }
    Ok(slash_path(&clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_target_rejects_escapes() {
        assert_eq!(clean_target("/_assets/css/app.css").unwrap(), "_assets/css/app.css");
        assert_eq!(clean_target("./index.html").unwrap(), "index.html");
        assert!(clean_target("../outside.js").is_err());
        assert!(clean_target("").is_err());
    }
}

// src/inject/mod.rs

//! Rewriting the entry HTML with `<link>`/`<script>` references.
//!
//! Two passes write into the same file, in this order:
//! 1. [`Injector::insert_dependencies`] fills the `bower:*` blocks with the
//!    third-party packages from the package manifest.
//! 2. [`Injector::inject_bundles`] fills the `inject:*` blocks with the
//!    locally compiled bundles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::transform::source::slash_path;
use crate::transform::{PipelineEnv, Source};

pub mod markers;
pub mod packages;

pub use markers::MarkerBlock;
pub use packages::{normalize, relative_to, PackageFiles, PackageResolver};

pub fn stylesheet_tag(href: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{href}\">")
}

pub fn script_tag(src: &str) -> String {
    format!("<script src=\"{src}\"></script>")
}

#[derive(Debug, Clone)]
pub struct Injector {
    config: Arc<Config>,
    fs: Arc<dyn FileSystem>,
}

impl Injector {
    pub fn new(config: Arc<Config>, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }

    /// Inject third-party package references and write the index back.
    pub fn insert_dependencies(&self) -> Result<()> {
        let resolver = PackageResolver::new(
            self.fs.as_ref(),
            self.config.root(),
            &self.config.packages.directory,
        );
        let files = resolver.resolve(Path::new(&self.config.packages.manifest))?;

        let index_dir = self.index_dir();
        let css: Vec<String> = files
            .css
            .iter()
            .map(|p| stylesheet_tag(&self.package_url(&index_dir, p)))
            .collect();
        let js: Vec<String> = files
            .js
            .iter()
            .map(|p| script_tag(&self.package_url(&index_dir, p)))
            .collect();

        info!(css = css.len(), js = js.len(), "injecting third-party packages");
        self.rewrite_index(&[
            (MarkerBlock::new("bower:css", "endbower")?, css),
            (MarkerBlock::new("bower:js", "endbower")?, js),
        ])
    }

    /// Inject the compiled local bundles and write the index back.
    pub fn inject_bundles(&self) -> Result<()> {
        let env = PipelineEnv::new(self.config.root(), Arc::clone(&self.fs));
        let css: Vec<String> = Source::glob(&self.config.globs.compiled_css)?
            .collect(&env)?
            .iter()
            .map(|a| stylesheet_tag(&root_url(&a.origin)))
            .collect();
        let js: Vec<String> = Source::glob(&self.config.globs.compiled_js)?
            .collect(&env)?
            .iter()
            .map(|a| script_tag(&root_url(&a.origin)))
            .collect();

        info!(css = css.len(), js = js.len(), "injecting local bundles");
        self.rewrite_index(&[
            (MarkerBlock::new("inject:css", "endinject")?, css),
            (MarkerBlock::new("inject:js", "endinject")?, js),
        ])
    }

    /// Directory of the index file, relative to the project root.
    fn index_dir(&self) -> PathBuf {
        Path::new(&self.config.paths.source).join(
            Path::new(self.config.index_key())
                .parent()
                .unwrap_or_else(|| Path::new("")),
        )
    }

    /// Package file as referenced from the index, with the ignore prefix cut.
    fn package_url(&self, index_dir: &Path, file: &Path) -> String {
        let relative = slash_path(&relative_to(&normalize(index_dir), file));
        let ignore = self.config.packages.ignore_path.trim_end_matches('/');
        match relative.strip_prefix(ignore) {
            Some(rest) if !ignore.is_empty() => rest.to_string(),
            _ => relative,
        }
    }

    fn rewrite_index(&self, blocks: &[(MarkerBlock, Vec<String>)]) -> Result<()> {
        let index = self.config.index_path();
        let mut html = self.fs.read_to_string(&index)?;
        for (block, lines) in blocks {
            match block.replace(&html, lines)? {
                Some(updated) => html = updated,
                None if lines.is_empty() => {}
                None => warn!(
                    index = %index.display(),
                    block = %block.label(),
                    "index has no marker for {} references; skipped",
                    lines.len()
                ),
            }
        }
        self.fs.write(&index, html.as_bytes())
    }
}

/// Root-absolute URL for a project-relative path.
pub fn root_url(path: &Path) -> String {
    format!("/{}", slash_path(path).trim_start_matches("./"))
}

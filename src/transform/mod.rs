// src/transform/mod.rs

//! File pipelines: an ordered list of stages over a set of assets.
//!
//! - [`source`] selects the input files from include/exclude globs.
//! - [`stages`] holds the generic stages (concatenation, external commands,
//!   writing to disk, reload notification).
//!
//! Stages run strictly in order and each one receives the previous stage's
//! full output; there is no per-file overlap between stages.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{FlowError, Result};
use crate::fs::FileSystem;

pub mod source;
pub mod stages;

pub use source::Source;
pub use stages::{Concat, Dest, ExternalCommand, Reload};

/// One file flowing through a pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the glob base it was selected from; this is what
    /// [`Dest`] appends to its output directory.
    pub relative: PathBuf,
    /// Project-relative path of the file the asset came from.
    pub origin: PathBuf,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(relative: impl Into<PathBuf>, origin: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            relative: relative.into(),
            origin: origin.into(),
            contents,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("relative", &self.relative)
            .field("origin", &self.origin)
            .field("bytes", &self.contents.len())
            .finish()
    }
}

/// What every stage gets to work with besides its input.
#[derive(Debug, Clone)]
pub struct PipelineEnv {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl PipelineEnv {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    /// Project root; external commands run here.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

/// Boxed future returned by [`Transform::apply`].
pub type TransformFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Asset>>> + Send + 'a>>;

/// A single pipeline stage.
pub trait Transform: Send + Sync {
    /// Stage name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the stage folds all inputs into fewer outputs, losing the
    /// identity of individual files.
    fn merges_files(&self) -> bool {
        false
    }

    /// Whether the stage keeps per-file state keyed on input identity
    /// (e.g. a lint cache).
    fn keyed_per_file(&self) -> bool {
        false
    }

    fn apply<'a>(&'a self, env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a>;
}

/// Source plus the ordered stages applied to its output.
pub struct Pipeline {
    name: String,
    source: Source,
    stages: Vec<Box<dyn Transform>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("stages", &stages)
            .finish()
    }
}

impl Pipeline {
    pub fn builder(name: impl Into<String>, source: Source) -> PipelineBuilder {
        PipelineBuilder {
            name: name.into(),
            source,
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Select the inputs and push them through every stage in order.
    ///
    /// The first failing stage aborts the pipeline; later stages never see
    /// partial output.
    pub async fn run(&self, env: &PipelineEnv) -> Result<Vec<Asset>> {
        let mut assets = self.source.collect(env)?;
        info!(pipeline = %self.name, files = assets.len(), "pipeline started");

        for stage in &self.stages {
            debug!(pipeline = %self.name, stage = stage.name(), inputs = assets.len(), "running stage");
            assets = stage.apply(env, assets).await?;
        }

        info!(pipeline = %self.name, outputs = assets.len(), "pipeline finished");
        Ok(assets)
    }
}

pub struct PipelineBuilder {
    name: String,
    source: Source,
    stages: Vec<Box<dyn Transform>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Validate the stage order.
    ///
    /// A per-file cached stage after a merging stage would only ever see the
    /// merged artifact, so that combination is rejected outright.
    pub fn build(self) -> Result<Pipeline> {
        let mut merged_by: Option<&str> = None;
        for stage in &self.stages {
            if stage.keyed_per_file() {
                if let Some(merger) = merged_by {
                    return Err(FlowError::Config(format!(
                        "pipeline '{}': stage '{}' caches per file and cannot run after '{}', which merges files",
                        self.name,
                        stage.name(),
                        merger
                    )));
                }
            }
            if stage.merges_files() {
                merged_by = Some(stage.name());
            }
        }

        Ok(Pipeline {
            name: self.name,
            source: self.source,
            stages: self.stages,
        })
    }
}

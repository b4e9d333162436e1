// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Transform '{stage}' failed: {message}")]
    Transform { stage: String, message: String },

    #[error("Lint violations reported by {linter}:\n{diagnostics}")]
    LintViolation { linter: String, diagnostics: String },

    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<FlowError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    pub fn transform(stage: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::Transform {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlowError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Fatal startup errors: unknown task references and cyclic graphs.
    pub fn is_configuration(&self) -> bool {
        matches!(self, FlowError::Config(_) | FlowError::DagCycle(_))
    }

    /// Strip `TaskFailed` wrappers down to the error that started it all.
    pub fn root_cause(&self) -> &FlowError {
        let mut current = self;
        while let FlowError::TaskFailed { source, .. } = current {
            current = source;
        }
        current
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowError>;

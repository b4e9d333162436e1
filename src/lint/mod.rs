// src/lint/mod.rs

//! Cached linting.
//!
//! - [`cache`] remembers which file contents already passed, per cache key.
//! - [`linter`] abstracts the linter collaborator.
//! - [`gate`] is the pipeline stage that combines the two.

pub mod cache;
pub mod gate;
pub mod linter;

pub use cache::{content_token, LintCache, LintCacheRegistry};
pub use gate::LintGate;
pub use linter::{ExternalLinter, LintFuture, Linter};

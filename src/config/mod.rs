// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like port and glob sanity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve};
pub use model::{
    BundleSection, Config, GlobsSection, LintSection, OptimizeSection, PackagesSection,
    PathsSection, RawConfig, ServerSection, ToolsSection, WatchRuleConfig,
};
pub use validate::validate_config;

// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{Config, RawConfig};
use crate::config::validate::validate_config;
use crate::errors::{FlowError, Result};

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "assetflow.toml";

/// Load a configuration file from a given path and return the raw `RawConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| FlowError::filesystem(path, e))?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// The project root becomes the directory containing the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    validate_config(raw, config_root_dir(path))
}

/// Resolve the configuration for a CLI invocation.
///
/// - An explicit path must exist.
/// - Without one, `assetflow.toml` is used when present; otherwise the
///   built-in defaults apply, rooted at the current directory.
pub fn resolve(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let default = default_config_path();
            if default.is_file() {
                load_and_validate(&default)
            } else {
                info!("no {DEFAULT_CONFIG_FILE} found; using built-in defaults");
                validate_config(RawConfig::default(), config_root_dir(&default))
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename (parent = ""), we fall back to the current
///   working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

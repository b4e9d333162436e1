// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{Config, RawConfig};
use crate::errors::{FlowError, Result};

impl TryFrom<RawConfig> for Config {
    type Error = FlowError;

    /// Validate against the current directory as project root.
    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_config(raw, PathBuf::from("."))
    }
}

/// Validate a raw config and freeze it into a [`Config`] rooted at `root`.
pub fn validate_config(mut raw: RawConfig, root: PathBuf) -> Result<Config> {
    validate_ports(&raw)?;
    validate_mounts(&raw)?;
    validate_bundles(&raw)?;
    raw.paths.index = normalize_index(&raw.paths.index)?;
    validate_globs(&raw)?;
    validate_watch_rules(&raw)?;
    Ok(Config::new_unchecked(raw, root))
}

fn validate_ports(cfg: &RawConfig) -> Result<()> {
    let server = &cfg.server;
    if server.dev_port == 0 || server.build_port == 0 {
        return Err(FlowError::Config(
            "[server] ports must be >= 1 (got 0)".to_string(),
        ));
    }
    if server.dev_port == server.build_port {
        return Err(FlowError::Config(format!(
            "[server].dev_port and [server].build_port must differ (both {})",
            server.dev_port
        )));
    }
    Ok(())
}

/// Mount prefixes must be absolute URL paths other than `/`.
fn validate_mounts(cfg: &RawConfig) -> Result<()> {
    let mounts = [
        ("server.third_party_url", &cfg.server.third_party_url),
        ("server.assets_url", &cfg.server.assets_url),
    ];
    for (key, prefix) in mounts {
        if !prefix.starts_with('/') || prefix.trim_matches('/').is_empty() {
            return Err(FlowError::Config(format!(
                "[{key}] must be a URL path like '/assets' (got '{prefix}')"
            )));
        }
    }
    Ok(())
}

/// `./index.html` and `/index.html` both become `index.html`.
fn normalize_index(index: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(index.trim()).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir => {}
            _ => {
                return Err(FlowError::Config(format!(
                    "[paths.index] must stay inside the source directory (got '{index}')"
                )));
            }
        }
    }
    if parts.is_empty() {
        return Err(FlowError::Config("[paths.index] must name a file".to_string()));
    }
    Ok(parts.join("/"))
}

fn validate_bundles(cfg: &RawConfig) -> Result<()> {
    let names = [
        ("bundle.css", &cfg.bundle.css),
        ("bundle.js", &cfg.bundle.js),
        ("optimize.library_bundle", &cfg.optimize.library_bundle),
        ("optimize.application_bundle", &cfg.optimize.application_bundle),
        ("optimize.manifest", &cfg.optimize.manifest),
        ("paths.index", &cfg.paths.index),
    ];
    for (key, value) in names {
        if value.trim().is_empty() {
            return Err(FlowError::Config(format!("[{key}] must not be empty")));
        }
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfig) -> Result<()> {
    let globs = &cfg.globs;
    let mut patterns: Vec<&str> = vec![
        &globs.styles,
        &globs.scripts,
        &globs.fonts,
        &globs.images,
        &globs.html,
        &globs.compiled_css,
        &globs.compiled_js,
    ];
    patterns.extend(cfg.lint.style.iter().map(String::as_str));
    patterns.extend(cfg.lint.script.iter().map(String::as_str));
    if let Some(rules) = &cfg.watch {
        patterns.extend(rules.iter().map(|r| r.pattern.as_str()));
    }

    for pattern in patterns {
        let bare = pattern.trim_start_matches('!').trim_start_matches("./");
        Glob::new(bare).map_err(|e| {
            FlowError::Config(format!("invalid glob pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_watch_rules(cfg: &RawConfig) -> Result<()> {
    if let Some(rules) = &cfg.watch {
        for rule in rules {
            if rule.tasks.is_empty() {
                return Err(FlowError::Config(format!(
                    "watch rule for '{}' must name at least one task",
                    rule.pattern
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(raw: RawConfig) -> Result<Config> {
        validate_config(raw, PathBuf::from("/project"))
    }

    #[test]
    fn index_is_normalised_to_its_manifest_key() {
        for index in ["./index.html", "/index.html", "index.html"] {
            let mut raw = RawConfig::default();
            raw.paths.index = index.to_string();
            assert_eq!(validate(raw).unwrap().index_key(), "index.html");
        }

        let mut raw = RawConfig::default();
        raw.paths.index = "./pages/home.html".to_string();
        let config = validate(raw).unwrap();
        assert_eq!(config.index_key(), "pages/home.html");
        assert_eq!(config.index_path(), PathBuf::from("/project/src/pages/home.html"));
    }

    #[test]
    fn index_outside_the_source_dir_is_rejected() {
        let mut raw = RawConfig::default();
        raw.paths.index = "../index.html".to_string();
        assert!(matches!(validate(raw), Err(FlowError::Config(_))));
    }

    #[test]
    fn mount_prefixes_must_be_url_paths() {
        for prefix in ["bower_components", "/", ""] {
            let mut raw = RawConfig::default();
            raw.server.third_party_url = prefix.to_string();
            assert!(matches!(validate(raw), Err(FlowError::Config(_))), "{prefix:?} accepted");
        }

        let mut raw = RawConfig::default();
        raw.server.assets_url = "_assets".to_string();
        assert!(matches!(validate(raw), Err(FlowError::Config(_))));

        assert!(validate(RawConfig::default()).is_ok());
    }
}

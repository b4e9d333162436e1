// src/lint/cache.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use blake3::Hasher;
use tracing::debug;

use crate::errors::{FlowError, Result};

/// Validity token for one file: the blake3 hash of its contents.
pub fn content_token(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

/// In-memory record of files that passed a lint run, keyed by path.
///
/// A file is "validated" only while its current contents hash to the token
/// stored after its last successful lint.
#[derive(Debug, Clone)]
pub struct LintCache {
    key: String,
    validated: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl LintCache {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            validated: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `path` with `contents` is byte-identical to its last
    /// successfully linted version.
    pub fn is_validated(&self, path: &Path, contents: &[u8]) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|token| *token == content_token(contents))
    }

    /// Record files that just passed the linter.
    pub fn mark_validated<'a, I>(&self, files: I)
    where
        I: IntoIterator<Item = (&'a Path, &'a [u8])>,
    {
        let mut validated = self.lock();
        for (path, contents) in files {
            debug!(cache = %self.key, path = %path.display(), "marking file validated");
            validated.insert(path.to_path_buf(), content_token(contents));
        }
    }

    /// Forget a file, e.g. after it was deleted.
    pub fn invalidate(&self, path: &Path) {
        if self.lock().remove(path).is_some() {
            debug!(cache = %self.key, path = %path.display(), "invalidated lint cache entry");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
        // A poisoned cache only loses "already validated" knowledge.
        self.validated.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Hands out lint caches and guarantees every key is used at most once.
#[derive(Debug, Default)]
pub struct LintCacheRegistry {
    keys: Mutex<BTreeSet<String>>,
}

impl LintCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &str) -> Result<LintCache> {
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.to_string()) {
            return Err(FlowError::Config(format!(
                "lint cache key '{key}' is already registered"
            )));
        }
        Ok(LintCache::new(key))
    }

    pub fn keys(&self) -> Vec<String> {
        let keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_tracks_content_not_path() {
        let registry = LintCacheRegistry::new();
        let cache = registry.register("lint-sass").unwrap();
        let path = Path::new("src/sass/main.scss");

        assert!(!cache.is_validated(path, b"a { color: red; }"));
        cache.mark_validated([(path, b"a { color: red; }".as_slice())]);
        assert!(cache.is_validated(path, b"a { color: red; }"));
        assert!(!cache.is_validated(path, b"a { color: blue; }"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let registry = LintCacheRegistry::new();
        registry.register("lint-js").unwrap();
        registry.register("lint-sass").unwrap();
        let err = registry.register("lint-js").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn caches_with_different_keys_are_independent() {
        let registry = LintCacheRegistry::new();
        let styles = registry.register("lint-sass").unwrap();
        let scripts = registry.register("lint-js").unwrap();
        let path = Path::new("shared/name");

        styles.mark_validated([(path, b"x".as_slice())]);
        assert!(!scripts.is_validated(path, b"x"));
    }
}

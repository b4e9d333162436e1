// src/transform/source.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fs::walk_files;
use crate::transform::{Asset, PipelineEnv};
use crate::watch::PatternSet;

/// Selects pipeline inputs from include/exclude globs.
///
/// Only the static base directories of the include patterns are walked.
/// Results are sorted by path so concatenation order is stable.
#[derive(Debug, Clone)]
pub struct Source {
    patterns: PatternSet,
}

impl Source {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Ok(Self {
            patterns: PatternSet::new(patterns)?,
        })
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        Self::new(&[pattern])
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Read every matching file.
    pub fn collect(&self, env: &PipelineEnv) -> Result<Vec<Asset>> {
        let mut found: BTreeMap<PathBuf, Asset> = BTreeMap::new();

        for base in self.patterns.bases() {
            let dir = env.root().join(base);
            for path in walk_files(env.fs(), &dir)? {
                let Ok(origin) = path.strip_prefix(env.root()) else {
                    continue;
                };
                if found.contains_key(origin) || !self.patterns.matches(&slash_path(origin)) {
                    continue;
                }
                let relative = self
                    .patterns
                    .base_for(origin)
                    .and_then(|b| origin.strip_prefix(b).ok())
                    .unwrap_or(origin)
                    .to_path_buf();
                let contents = env.fs().read(&path)?;
                found.insert(
                    origin.to_path_buf(),
                    Asset::new(relative, origin.to_path_buf(), contents),
                );
            }
        }

        debug!(patterns = ?self.patterns.patterns(), files = found.len(), "source collected");
        Ok(found.into_values().collect())
    }
}

/// Forward-slash form of a relative path, as glob matching expects.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn selects_sorted_files_relative_to_their_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/project/src/sass/main.scss", "b");
        fs.add_file("/project/src/sass/_grid.scss", "a");
        fs.add_file("/project/src/sass/vendor/reset.scss", "v");
        fs.add_file("/project/src/scripts/app.js", "js");

        let env = PipelineEnv::new("/project", Arc::new(fs));
        let source = Source::new(&["src/sass/**/*.scss", "!src/sass/vendor/**/*.scss"]).unwrap();
        let assets = source.collect(&env).unwrap();

        let relative: Vec<_> = assets.iter().map(|a| a.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("_grid.scss"), PathBuf::from("main.scss")]
        );
        assert_eq!(assets[0].origin, PathBuf::from("src/sass/_grid.scss"));
    }

    #[test]
    fn missing_base_directory_yields_nothing() {
        let env = PipelineEnv::new("/project", Arc::new(MockFileSystem::new()));
        let source = Source::glob("src/fonts/**/*").unwrap();
        assert!(source.collect(&env).unwrap().is_empty());
    }
}

// src/watch/patterns.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{FlowError, Result};

/// Compiled include/exclude glob list, in the usual asset-pipeline notation:
///
/// ```toml
/// style = ["src/sass/**/*.scss", "!src/sass/vendor/**/*.scss"]
/// ```
///
/// Patterns are relative to the project root; a leading `!` turns a pattern
/// into an exclusion. `*` never crosses a `/`, `**` does.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
    bases: Vec<PathBuf>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            match pattern.strip_prefix('!') {
                Some(excluded) => excludes.push(normalize(excluded)),
                None => includes.push(normalize(pattern)),
            }
        }

        let mut bases: Vec<PathBuf> = includes.iter().map(|p| static_base(p)).collect();
        bases.sort();
        bases.dedup();

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            include_set: compile_globs(&includes)?,
            exclude_set: if excludes.is_empty() {
                None
            } else {
                Some(compile_globs(&excludes)?)
            },
            bases,
        })
    }

    pub fn single(pattern: &str) -> Result<Self> {
        Self::new(&[pattern])
    }

    /// The patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Static directories (or files) the include patterns can match under.
    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    /// Returns true if `rel_path` (relative to the project root, forward
    /// slashes) is included and not excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_start_matches("./");
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// The base `rel_path` should be made relative to: the longest static
    /// base that contains it.
    pub fn base_for(&self, rel_path: &Path) -> Option<&Path> {
        self.bases
            .iter()
            .filter(|base| rel_path.starts_with(base))
            .max_by_key(|base| base.components().count())
            .map(PathBuf::as_path)
    }
}

fn normalize(pattern: &str) -> String {
    pattern.trim_start_matches("./").to_string()
}

/// Leading components of a glob that contain no wildcard, e.g.
/// `src/sass/**/*.scss` -> `src/sass`.
pub fn static_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let components: Vec<Component<'_>> = path.components().collect();
    let split_idx = components
        .iter()
        .position(|c| c.as_os_str().to_string_lossy().contains(['*', '?', '[', '{']))
        .unwrap_or(components.len());

    if split_idx == components.len() {
        // Literal path: its parent is the base, like a single-file glob.
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }
    components.iter().take(split_idx).collect()
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| FlowError::Config(format!("invalid glob pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| FlowError::Config(format!("failed to build glob set: {e}")))
}

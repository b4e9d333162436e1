// src/optimize/manifest.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Original relative path -> revisioned relative path, both relative to the
/// build directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(pub BTreeMap<String, String>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, original: impl Into<String>, revisioned: impl Into<String>) {
        self.0.insert(original.into(), revisioned.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.0.get(original).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pretty JSON with sorted keys and a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.0)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a manifest if it exists.
    ///
    /// An unreadable manifest is treated as absent: it only drives cleanup,
    /// and guessing wrong there must not delete anything.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Option<Self>> {
        if !fs.is_file(path) {
            return Ok(None);
        }
        let text = fs.read_to_string(path)?;
        match Self::from_json(&text) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable manifest");
                Ok(None)
            }
        }
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        fs.write(path, self.to_json()?.as_bytes())
    }

    /// Revisioned files of `self` that `next` no longer produces.
    ///
    /// Anything `next` references is never part of the result.
    pub fn stale_entries(&self, next: &Manifest) -> Vec<String> {
        let keep: BTreeSet<&str> = next.0.values().map(String::as_str).collect();
        let stale: BTreeSet<&str> = self
            .0
            .values()
            .map(String::as_str)
            .filter(|v| !keep.contains(v))
            .collect();
        stale.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        let mut m = Manifest::new();
        for (k, v) in entries {
            m.insert(*k, *v);
        }
        m
    }

    #[test]
    fn stale_entries_never_include_next_values() {
        let previous = manifest(&[
            ("app.css", "app-aaaaaaaaaa.css"),
            ("index.html", "index-1111111111.html"),
            ("lib.js", "lib-cccccccccc.js"),
        ]);
        let next = manifest(&[
            ("app.css", "app-bbbbbbbbbb.css"),
            ("index.html", "index-2222222222.html"),
            ("lib.js", "lib-cccccccccc.js"),
        ]);
        assert_eq!(
            previous.stale_entries(&next),
            vec!["app-aaaaaaaaaa.css", "index-1111111111.html"]
        );
    }

    #[test]
    fn json_is_sorted() {
        let m = manifest(&[("b.js", "b-1.js"), ("a.css", "a-1.css")]);
        let json = m.to_json().unwrap();
        assert!(json.find("a.css").unwrap() < json.find("b.js").unwrap());
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }
}

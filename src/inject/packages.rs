// src/inject/packages.rs

//! Third-party package resolution from a bower-style manifest.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{FlowError, Result};
use crate::fs::FileSystem;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MainField {
    One(String),
    Many(Vec<String>),
}

impl MainField {
    fn entries(&self) -> Vec<String> {
        match self {
            MainField::One(entry) => vec![entry.clone()],
            MainField::Many(entries) => entries.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Override {
    main: Option<MainField>,
    dependencies: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    main: Option<MainField>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    overrides: BTreeMap<String, Override>,
}

/// Files a package contributes, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFiles {
    /// Root-relative paths, dependency-first.
    pub css: Vec<PathBuf>,
    pub js: Vec<PathBuf>,
}

struct ResolvedPackage {
    main: Vec<String>,
    dependencies: Vec<String>,
}

/// Resolves the project's declared packages to their main files.
pub struct PackageResolver<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    /// Packages directory, relative to `root`.
    directory: PathBuf,
}

impl<'a> PackageResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path, directory: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root,
            directory: directory.into(),
        }
    }

    /// Read `manifest` (root-relative) and collect the main files of every
    /// declared package and their dependencies, each package after the
    /// packages it depends on.
    pub fn resolve(&self, manifest: &Path) -> Result<PackageFiles> {
        let project: PackageManifest = self.read_manifest(&self.root.join(manifest))?;

        let mut packages: BTreeMap<String, ResolvedPackage> = BTreeMap::new();
        let mut pending: Vec<String> = project.dependencies.keys().cloned().collect();
        while let Some(name) = pending.pop() {
            if packages.contains_key(&name) {
                continue;
            }
            let Some(package) = self.resolve_package(&name, project.overrides.get(&name))? else {
                continue;
            };
            pending.extend(package.dependencies.iter().cloned());
            packages.insert(name, package);
        }

        let order = dependency_order(&packages)?;
        let mut files = PackageFiles::default();
        for name in order {
            let package = &packages[&name];
            for entry in &package.main {
                let path = normalize(&self.directory.join(&name).join(entry));
                if !self.fs.is_file(&self.root.join(&path)) {
                    warn!(package = %name, file = %path.display(), "package main file is missing; skipping");
                    continue;
                }
                match path.extension().and_then(|e| e.to_str()) {
                    Some("css") => files.css.push(path),
                    Some("js") => files.js.push(path),
                    _ => debug!(package = %name, file = %path.display(), "ignoring non css/js main file"),
                }
            }
        }
        Ok(files)
    }

    fn resolve_package(
        &self,
        name: &str,
        override_entry: Option<&Override>,
    ) -> Result<Option<ResolvedPackage>> {
        let dir = self.root.join(&self.directory).join(name);
        let manifest_path = ["bower.json", ".bower.json"]
            .iter()
            .map(|file| dir.join(file))
            .find(|path| self.fs.is_file(path));

        let manifest = match manifest_path {
            Some(path) => self.read_manifest(&path)?,
            None if override_entry.is_some_and(|o| o.main.is_some()) => PackageManifest::default(),
            None => {
                warn!(package = %name, dir = %dir.display(), "package is not installed; skipping");
                return Ok(None);
            }
        };

        let main = override_entry
            .and_then(|o| o.main.as_ref())
            .or(manifest.main.as_ref())
            .map(MainField::entries)
            .unwrap_or_default();
        if main.is_empty() {
            warn!(package = %name, "package declares no main files");
        }

        let dependencies = override_entry
            .and_then(|o| o.dependencies.as_ref())
            .unwrap_or(&manifest.dependencies)
            .keys()
            .cloned()
            .collect();

        Ok(Some(ResolvedPackage { main, dependencies }))
    }

    fn read_manifest(&self, path: &Path) -> Result<PackageManifest> {
        let text = self.fs.read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            FlowError::transform("insert-dependencies", format!("{}: {e}", path.display()))
        })
    }
}

/// Dependency-first order; packages without a relation are ordered by name.
fn dependency_order(packages: &BTreeMap<String, ResolvedPackage>) -> Result<Vec<String>> {
    fn visit(
        name: &str,
        packages: &BTreeMap<String, ResolvedPackage>,
        visiting: &mut BTreeSet<String>,
        done: &mut BTreeSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name.to_string()) {
            return Err(FlowError::transform(
                "insert-dependencies",
                format!("package dependency cycle involving '{name}'"),
            ));
        }
        if let Some(package) = packages.get(name) {
            let mut deps = package.dependencies.clone();
            deps.sort();
            for dep in deps.iter().filter(|d| packages.contains_key(*d)) {
                visit(dep, packages, visiting, done, order)?;
            }
        }
        visiting.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    let mut order = Vec::new();
    let mut visiting = BTreeSet::new();
    let mut done = BTreeSet::new();
    for name in packages.keys() {
        visit(name, packages, &mut visiting, &mut done, &mut order)?;
    }
    Ok(order)
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `target` as seen from directory `from`; both relative to the
/// same root.
pub fn relative_to(from: &Path, target: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();
    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn relative_paths_climb_out_of_the_index_dir() {
        assert_eq!(
            relative_to(Path::new("src"), Path::new("bower_components/jquery/dist/jquery.js")),
            PathBuf::from("../bower_components/jquery/dist/jquery.js")
        );
        assert_eq!(normalize(Path::new("a/./b/../c.js")), PathBuf::from("a/c.js"));
    }

    #[test]
    fn dependencies_come_first_and_overrides_win() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/p/bower.json",
            r#"{
                "dependencies": { "bootstrap": "^3", "jquery": "^2" },
                "overrides": { "bootstrap": { "main": ["dist/css/bootstrap.css", "dist/js/bootstrap.js"] } }
            }"#,
        );
        fs.add_file(
            "/p/bower_components/bootstrap/bower.json",
            r#"{ "main": "less/bootstrap.less", "dependencies": { "jquery": ">=1" } }"#,
        );
        fs.add_file("/p/bower_components/bootstrap/dist/css/bootstrap.css", "");
        fs.add_file("/p/bower_components/bootstrap/dist/js/bootstrap.js", "");
        fs.add_file(
            "/p/bower_components/jquery/.bower.json",
            r#"{ "main": "dist/jquery.js" }"#,
        );
        fs.add_file("/p/bower_components/jquery/dist/jquery.js", "");

        let resolver = PackageResolver::new(&fs, Path::new("/p"), "bower_components");
        let files = resolver.resolve(Path::new("bower.json")).unwrap();

        assert_eq!(
            files.js,
            vec![
                PathBuf::from("bower_components/jquery/dist/jquery.js"),
                PathBuf::from("bower_components/bootstrap/dist/js/bootstrap.js"),
            ]
        );
        assert_eq!(
            files.css,
            vec![PathBuf::from("bower_components/bootstrap/dist/css/bootstrap.css")]
        );
    }

    #[test]
    fn missing_packages_are_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/bower.json", r#"{ "dependencies": { "ghost": "1" } }"#);
        let resolver = PackageResolver::new(&fs, Path::new("/p"), "bower_components");
        assert_eq!(resolver.resolve(Path::new("bower.json")).unwrap(), PackageFiles::default());
    }
}

// src/watch/path_utils.rs

use std::path::Path;

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, since watchers on some
/// platforms report a different absolute prefix for the same directory
/// (`/private/var` vs `/var` on macOS). Returns `None` for paths outside
/// `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let (root, path) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path.strip_prefix(&root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_the_root() {
        assert_eq!(
            relative_str(Path::new("/project"), Path::new("/project/src/sass/main.scss")).as_deref(),
            Some("src/sass/main.scss")
        );
    }

    #[test]
    fn paths_outside_the_root_are_none() {
        assert_eq!(relative_str(Path::new("/project"), Path::new("/elsewhere/x.js")), None);
    }
}

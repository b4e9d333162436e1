// src/optimize/rev.rs

use std::collections::BTreeMap;

use blake3::Hasher;
use regex::Regex;

use crate::errors::{FlowError, Result};

/// Hex digits of the content hash kept in revisioned names.
pub const HASH_LEN: usize = 10;

pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let mut hex = hasher.finalize().to_hex().to_string();
    hex.truncate(HASH_LEN);
    hex
}

/// `css/app.css` -> `css/app-<hash>.css`.
///
/// The hash goes before the first dot of the file name, so `lib.min.js`
/// becomes `lib-<hash>.min.js`.
pub fn revision_path(path: &str, contents: &[u8]) -> String {
    let hash = content_hash(contents);
    let (dir, file) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };
    match file.find('.') {
        Some(dot) if dot > 0 => format!("{dir}{}-{hash}{}", &file[..dot], &file[dot..]),
        _ => format!("{dir}{file}-{hash}"),
    }
}

/// Replace every reference to a manifest key in `text` with its value.
///
/// A key only matches as a whole reference: it must be delimited by a quote,
/// whitespace, `/`, `=` or `(` before it, and by a quote, whitespace, `?`,
/// `#`, `>` or `)` after it (or the ends of the text). All keys are matched in
/// one pass, longest first, so a replacement is never rewritten again by a
/// shorter key.
pub fn rewrite_references(text: &str, renames: &BTreeMap<String, String>) -> Result<String> {
    if renames.is_empty() {
        return Ok(text.to_string());
    }

    let mut keys: Vec<&String> = renames.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r#"(^|["'/=\s(])({alternation})(["'?#\s>)]|$)"#);
    let re = Regex::new(&pattern)
        .map_err(|e| FlowError::transform("rev-replace", format!("building pattern: {e}")))?;

    Ok(re
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let key = &caps[2];
            let renamed = renames.get(key).map(String::as_str).unwrap_or(key);
            format!("{}{renamed}{}", &caps[1], &caps[3])
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_addressed() {
        let a = revision_path("_assets/css/app.css", b"a{}");
        assert_eq!(a, revision_path("_assets/css/app.css", b"a{}"));
        assert_ne!(a, revision_path("_assets/css/app.css", b"b{}"));
        assert!(a.starts_with("_assets/css/app-"));
        assert!(a.ends_with(".css"));
        assert_eq!(a.len(), "_assets/css/app-.css".len() + HASH_LEN);
    }

    #[test]
    fn hash_goes_before_the_first_dot() {
        let rev = revision_path("lib.min.js", b"x");
        assert!(rev.starts_with("lib-"));
        assert!(rev.ends_with(".min.js"));
    }

    #[test]
    fn longer_keys_win() {
        let mut renames = BTreeMap::new();
        renames.insert("app.js".to_string(), "app-1111111111.js".to_string());
        renames.insert("js/app.js".to_string(), "js/app-2222222222.js".to_string());
        let out = rewrite_references(r#"<script src="js/app.js"></script>"#, &renames).unwrap();
        assert_eq!(out, r#"<script src="js/app-2222222222.js"></script>"#);
    }

    #[test]
    fn only_whole_references_are_rewritten() {
        let mut renames = BTreeMap::new();
        renames.insert(
            "_assets/js/app.js".to_string(),
            "_assets/js/app-3333333333.js".to_string(),
        );
        let html = concat!(
            r#"<script src="/_assets/js/app.js?v=1"></script>"#,
            "\n",
            r#"<link rel="manifest" href="/_assets/js/app.json">"#,
            "\n",
            r#"<!-- map: /_assets/js/app.js.map -->"#,
            "\n",
            r#"<script src="/my_assets/js/app.js"></script>"#,
        );
        let out = rewrite_references(html, &renames).unwrap();
        assert!(out.contains(r#"src="/_assets/js/app-3333333333.js?v=1""#));
        assert!(out.contains("/_assets/js/app.json"));
        assert!(out.contains("/_assets/js/app.js.map"));
        assert!(out.contains("/my_assets/js/app.js"));
    }

    #[test]
    fn bare_text_is_a_reference() {
        let mut renames = BTreeMap::new();
        renames.insert("index.html".to_string(), "index-4444444444.html".to_string());
        assert_eq!(rewrite_references("index.html", &renames).unwrap(), "index-4444444444.html");
    }
}

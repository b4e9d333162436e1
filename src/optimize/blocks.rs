// src/optimize/blocks.rs

//! Build-block comments in the entry HTML:
//!
//! ```html
//! <!-- build:css(.tmp) _assets/css/app.css -->
//! <link rel="stylesheet" href="/_assets/css/bundle.css">
//! <!-- endbuild -->
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{FlowError, Result};

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*build:(\w+)(?:\(([^)]*)\))?(?:\s+([^\s>]+))?\s*-->")
        .unwrap_or_else(|e| panic!("build block pattern: {e}"))
});

static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*endbuild\s*-->").unwrap_or_else(|e| panic!("endbuild pattern: {e}"))
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|src)\s*=\s*["']([^"']+)["']"#)
        .unwrap_or_else(|e| panic!("reference pattern: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Css,
    Js,
    /// Drop the block's content from the output.
    Remove,
}

impl BlockKind {
    fn parse(kind: &str) -> Result<Self> {
        match kind {
            "css" => Ok(BlockKind::Css),
            "js" => Ok(BlockKind::Js),
            "remove" => Ok(BlockKind::Remove),
            other => Err(FlowError::transform(
                "optimize",
                format!("unknown build block type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlock {
    pub kind: BlockKind,
    /// Extra directory to search references in, from `build:css(<dir>)`.
    pub alternate_search_path: Option<String>,
    /// Output path of the bundle, relative to the build directory. Empty for
    /// `build:remove`.
    pub target: String,
    /// `href`/`src` values inside the block, in document order.
    pub references: Vec<String>,
    /// Byte range of the whole block, markers included.
    pub span: Range<usize>,
}

impl BuildBlock {
    /// Tag replacing the block in the output HTML.
    pub fn replacement(&self) -> String {
        match self.kind {
            BlockKind::Css => crate::inject::stylesheet_tag(&self.target),
            BlockKind::Js => crate::inject::script_tag(&self.target),
            BlockKind::Remove => String::new(),
        }
    }
}

/// Find every build block, in document order.
pub fn parse_blocks(html: &str) -> Result<Vec<BuildBlock>> {
    let mut blocks = Vec::new();
    let mut offset = 0;

    while let Some(start) = BLOCK_START.captures_at(html, offset) {
        let whole = start.get(0).map_or(offset..offset, |m| m.range());
        let kind = BlockKind::parse(&start[1])?;
        let target = start.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
        if target.is_empty() && kind != BlockKind::Remove {
            return Err(FlowError::transform(
                "optimize",
                format!("build:{} block has no target file", &start[1]),
            ));
        }

        let Some(end) = BLOCK_END.find_at(html, whole.end) else {
            return Err(FlowError::transform(
                "optimize",
                format!("build block for '{target}' has no <!-- endbuild -->"),
            ));
        };

        let body = &html[whole.end..end.start()];
        if BLOCK_START.is_match(body) {
            return Err(FlowError::transform(
                "optimize",
                format!("build block for '{target}' is nested in another block"),
            ));
        }
        let references = REFERENCE
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .collect();

        blocks.push(BuildBlock {
            kind,
            alternate_search_path: start.get(2).map(|m| m.as_str().to_string()),
            target,
            references,
            span: whole.start..end.end(),
        });
        offset = end.end();
    }

    Ok(blocks)
}

/// Replace every block with its single output tag.
pub fn replace_blocks(html: &str, blocks: &[BuildBlock]) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for block in blocks {
        out.push_str(&html[cursor..block.span.start]);
        out.push_str(&block.replacement());
        cursor = block.span.end;
    }
    out.push_str(&html[cursor..]);
    out
}

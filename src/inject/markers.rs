// src/inject/markers.rs

use regex::Regex;

use crate::errors::{FlowError, Result};

/// A named comment block, e.g. `<!-- bower:css -->` ... `<!-- endbower -->`.
#[derive(Debug, Clone)]
pub struct MarkerBlock {
    start: Regex,
    end: Regex,
    label: String,
}

impl MarkerBlock {
    /// `start` and `end` are the comment bodies, e.g. `bower:css` and
    /// `endbower`. Whitespace inside the comment delimiters is optional.
    pub fn new(start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            start: comment_regex(start)?,
            end: comment_regex(end)?,
            label: start.to_string(),
        })
    }

    /// Body of the start marker, e.g. `bower:css`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace whatever sits between the markers with `lines`, one per line,
    /// indented like the start marker.
    ///
    /// Returns `Ok(None)` when the start marker is absent and an error when
    /// it is never closed.
    pub fn replace(&self, html: &str, lines: &[String]) -> Result<Option<String>> {
        let Some(start) = self.start.find(html) else {
            return Ok(None);
        };
        let Some(end) = self.end.find(&html[start.end()..]) else {
            return Err(FlowError::transform(
                "inject",
                format!("marker <!-- {} --> is never closed", self.label),
            ));
        };
        let end_at = start.end() + end.start();

        let line_start = html[..start.start()].rfind('\n').map_or(0, |i| i + 1);
        let indent: String = html[line_start..start.start()]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();

        let mut out = String::with_capacity(html.len() + lines.iter().map(String::len).sum::<usize>());
        out.push_str(&html[..start.end()]);
        for line in lines {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(line);
        }
        out.push('\n');
        out.push_str(&indent);
        out.push_str(&html[end_at..]);
        Ok(Some(out))
    }
}

fn comment_regex(body: &str) -> Result<Regex> {
    let pattern = format!(r"<!--\s*{}\s*-->", regex::escape(body));
    Regex::new(&pattern).map_err(|e| FlowError::Config(format!("invalid marker '{body}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<head>\n    <!-- bower:css -->\n    <link rel=\"stylesheet\" href=\"/old.css\">\n    <!-- endbower -->\n</head>";

    #[test]
    fn replaces_content_and_keeps_indentation() {
        let block = MarkerBlock::new("bower:css", "endbower").unwrap();
        let out = block
            .replace(PAGE, &["<link rel=\"stylesheet\" href=\"/new.css\">".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "<head>\n    <!-- bower:css -->\n    <link rel=\"stylesheet\" href=\"/new.css\">\n    <!-- endbower -->\n</head>"
        );
    }

    #[test]
    fn replacing_twice_is_stable() {
        let block = MarkerBlock::new("bower:css", "endbower").unwrap();
        let lines = vec!["<link rel=\"stylesheet\" href=\"/a.css\">".to_string()];
        let once = block.replace(PAGE, &lines).unwrap().unwrap();
        let twice = block.replace(&once, &lines).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_marker_is_not_an_error() {
        let block = MarkerBlock::new("inject:js", "endinject").unwrap();
        assert!(block.replace(PAGE, &[]).unwrap().is_none());
    }

    #[test]
    fn unterminated_marker_is_an_error() {
        let block = MarkerBlock::new("inject:js", "endinject").unwrap();
        assert!(block.replace("<!-- inject:js -->\n<p>", &[]).is_err());
    }
}

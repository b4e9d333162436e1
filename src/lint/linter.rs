// src/lint/linter.rs

use std::future::Future;
use std::pin::Pin;

use tracing::error;

use crate::errors::{FlowError, Result};
use crate::exec::{run_shell, shell_quote};
use crate::transform::{Asset, PipelineEnv};

/// Boxed future returned by [`Linter::lint`].
pub type LintFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A linter collaborator: checks a batch of files and either passes or
/// reports violations.
pub trait Linter: Send + Sync {
    fn name(&self) -> &str;

    /// Lint `files`. Violations come back as [`FlowError::LintViolation`].
    fn lint<'a>(&'a self, env: &'a PipelineEnv, files: &'a [Asset]) -> LintFuture<'a>;
}

/// Runs a linter command with the files to check appended.
///
/// `{rules}` in the template is replaced by the (quoted) rule file.
#[derive(Debug, Clone)]
pub struct ExternalLinter {
    name: String,
    template: String,
    rules: String,
}

impl ExternalLinter {
    pub fn new(name: impl Into<String>, template: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            rules: rules.into(),
        }
    }

    /// Full command line for the given files.
    pub fn command_for(&self, files: &[Asset]) -> String {
        let mut command = self.template.replace("{rules}", &shell_quote(&self.rules));
        for file in files {
            command.push(' ');
            command.push_str(&shell_quote(&file.origin.to_string_lossy()));
        }
        command
    }
}

impl Linter for ExternalLinter {
    fn name(&self) -> &str {
        &self.name
    }

    fn lint<'a>(&'a self, env: &'a PipelineEnv, files: &'a [Asset]) -> LintFuture<'a> {
        Box::pin(async move {
            let command = self.command_for(files);
            let output = run_shell(&command, None, env.root()).await?;
            if output.success {
                return Ok(());
            }

            let diagnostics = output.diagnostics();
            // Diagnostics are for the user, not just the log.
            println!("{diagnostics}");
            error!(linter = %self.name, files = files.len(), "lint violations reported");
            Err(FlowError::LintViolation {
                linter: self.name.clone(),
                diagnostics,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_rules_and_appends_files() {
        let linter = ExternalLinter::new(
            "lint-js",
            "eslint --config {rules}",
            "eslint.config.json",
        );
        let files = vec![
            Asset::new("app.js", "src/scripts/app.js", Vec::new()),
            Asset::new("my util.js", "src/scripts/my util.js", Vec::new()),
        ];
        let command = linter.command_for(&files);
        assert!(command.starts_with("eslint --config eslint.config.json src/scripts/app.js "));
        if cfg!(unix) {
            assert!(command.ends_with("'src/scripts/my util.js'"));
        }
    }
}

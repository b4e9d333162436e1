// src/watch/rules.rs

use crate::config::WatchRuleConfig;
use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::{FlowError, Result};
use crate::watch::PatternSet;

/// A compiled `[[watch]]` entry: when `pattern` matches a changed path, run
/// `tasks` in order.
#[derive(Debug, Clone)]
pub struct WatchRule {
    pattern: PatternSet,
    tasks: Vec<TaskName>,
}

impl WatchRule {
    pub fn new(pattern: PatternSet, tasks: Vec<TaskName>) -> Self {
        Self { pattern, tasks }
    }

    pub fn pattern(&self) -> &PatternSet {
        &self.pattern
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// True if any of the root-relative `paths` matches.
    pub fn matches_any<S: AsRef<str>>(&self, paths: &[S]) -> bool {
        paths.iter().any(|p| self.pattern.matches(p.as_ref()))
    }
}

/// Compile the configured rules, rejecting task names the graph does not
/// know.
pub fn compile_rules(configs: &[WatchRuleConfig], graph: &TaskGraph) -> Result<Vec<WatchRule>> {
    configs
        .iter()
        .map(|rule| {
            if rule.tasks.is_empty() {
                return Err(FlowError::Config(format!(
                    "watch rule '{}' names no tasks",
                    rule.pattern
                )));
            }
            if let Some(unknown) = rule.tasks.iter().find(|t| !graph.contains(t)) {
                return Err(FlowError::Config(format!(
                    "watch rule '{}' refers to unknown task '{}'",
                    rule.pattern, unknown
                )));
            }
            Ok(WatchRule::new(
                PatternSet::single(&rule.pattern)?,
                rule.tasks.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{noop, TaskGraphBuilder};

    fn graph() -> TaskGraph {
        TaskGraphBuilder::default()
            .register("compile-sass", Vec::<&str>::new(), noop())
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_task_is_a_configuration_error() {
        let rules = [WatchRuleConfig::new("src/**/*.js", &["compile-js"])];
        let err = compile_rules(&rules, &graph()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn compiled_rule_matches_its_pattern() {
        let rules = [WatchRuleConfig::new("src/sass/**/*.scss", &["compile-sass"])];
        let compiled = compile_rules(&rules, &graph()).unwrap();
        assert!(compiled[0].matches_any(&["src/sass/main.scss"]));
        assert!(!compiled[0].matches_any(&["src/scripts/app.js"]));
    }
}

// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::dag::work::TaskWork;
use crate::engine::TaskName;

/// Internal node structure: stores immediate prerequisites, dependents and
/// the work to run.
#[derive(Clone)]
pub(crate) struct TaskNode {
    /// Tasks that must complete before this one can run.
    pub(crate) prerequisites: BTreeSet<TaskName>,
    /// Tasks that list this one as a prerequisite.
    pub(crate) dependents: Vec<TaskName>,
    pub(crate) work: Arc<dyn TaskWork>,
}

/// Validated, immutable task graph keyed by task name.
///
/// Only [`crate::dag::TaskGraphBuilder::build`] constructs one, so every
/// prerequisite resolves and the graph is acyclic.
#[derive(Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, TaskNode>,
}

impl TaskGraph {
    pub(crate) fn from_nodes(nodes: BTreeMap<TaskName, TaskNode>) -> Self {
        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate prerequisites of a task.
    pub fn prerequisites_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.nodes
            .get(name)
            .into_iter()
            .flat_map(|n| n.prerequisites.iter().map(|s| s.as_str()))
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn work_of(&self, name: &str) -> Option<Arc<dyn TaskWork>> {
        self.nodes.get(name).map(|n| Arc::clone(&n.work))
    }

    /// `name` plus every transitive prerequisite.
    pub fn closure_of(&self, name: &str) -> BTreeSet<TaskName> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !self.contains(&current) || !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.prerequisites_of(&current).map(str::to_string));
        }
        seen
    }

    /// Deterministic topological order of the closure of `name`, ending with
    /// `name` itself. Empty if the task is unknown.
    ///
    /// Prerequisites are visited in sorted order, so the result is stable
    /// across calls.
    pub fn execution_order(&self, name: &str) -> Vec<TaskName> {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        if self.contains(name) {
            self.visit_post_order(name, &mut visited, &mut order);
        }
        order
    }

    fn visit_post_order(
        &self,
        name: &str,
        visited: &mut BTreeSet<TaskName>,
        order: &mut Vec<TaskName>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        for prereq in self.prerequisites_of(name) {
            self.visit_post_order(prereq, visited, order);
        }
        order.push(name.to_string());
    }
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, node) in &self.nodes {
            map.entry(name, &node.prerequisites);
        }
        map.finish()
    }
}

// src/dag/builder.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::graph::{TaskGraph, TaskNode};
use crate::dag::work::TaskWork;
use crate::engine::TaskName;
use crate::errors::{FlowError, Result};

struct Registration {
    name: TaskName,
    prerequisites: Vec<TaskName>,
    work: Arc<dyn TaskWork>,
}

/// Collects task registrations and turns them into a validated [`TaskGraph`].
///
/// Registration itself never fails; every check runs in [`build`](Self::build)
/// so the whole graph is validated before anything executes.
#[derive(Default)]
pub struct TaskGraphBuilder {
    registrations: Vec<Registration>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with its prerequisites and work.
    pub fn register<I, S>(mut self, name: &str, prerequisites: I, work: Arc<dyn TaskWork>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(name, prerequisites, work);
        self
    }

    /// Non-consuming variant of [`register`](Self::register).
    pub fn add<I, S>(&mut self, name: &str, prerequisites: I, work: Arc<dyn TaskWork>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registrations.push(Registration {
            name: name.to_string(),
            prerequisites: prerequisites.into_iter().map(Into::into).collect(),
            work,
        });
    }

    /// Validate and freeze the graph.
    ///
    /// Fails with a configuration error on duplicate names, unknown or
    /// self-referencing prerequisites, and cycles.
    pub fn build(self) -> Result<TaskGraph> {
        let mut nodes: BTreeMap<TaskName, TaskNode> = BTreeMap::new();

        for reg in self.registrations {
            if reg.name.trim().is_empty() {
                return Err(FlowError::Config("task names must not be empty".to_string()));
            }
            if nodes.contains_key(&reg.name) {
                return Err(FlowError::Config(format!(
                    "task '{}' is registered more than once",
                    reg.name
                )));
            }
            let prerequisites: BTreeSet<TaskName> = reg.prerequisites.into_iter().collect();
            nodes.insert(
                reg.name,
                TaskNode {
                    prerequisites,
                    dependents: Vec::new(),
                    work: reg.work,
                },
            );
        }

        validate_prerequisites(&nodes)?;
        validate_acyclic(&nodes)?;

        // Populate dependents based on prerequisites.
        let edges: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| {
                node.prerequisites
                    .iter()
                    .map(move |prereq| (prereq.clone(), name.clone()))
            })
            .collect();
        for (prereq, dependent) in edges {
            if let Some(node) = nodes.get_mut(&prereq) {
                node.dependents.push(dependent);
            }
        }

        debug!(tasks = nodes.len(), "task graph validated");
        Ok(TaskGraph::from_nodes(nodes))
    }
}

fn validate_prerequisites(nodes: &BTreeMap<TaskName, TaskNode>) -> Result<()> {
    for (name, node) in nodes {
        for prereq in &node.prerequisites {
            if prereq == name {
                return Err(FlowError::DagCycle(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            if !nodes.contains_key(prereq) {
                return Err(FlowError::Config(format!(
                    "task '{name}' depends on unknown task '{prereq}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(nodes: &BTreeMap<TaskName, TaskNode>) -> Result<()> {
    // Edge direction: prerequisite -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, node) in nodes {
        for prereq in &node.prerequisites {
            graph.add_edge(prereq.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(FlowError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

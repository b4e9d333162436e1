// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod inject;
pub mod lint;
pub mod logging;
pub mod optimize;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod transform;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::dag::TaskGraph;
use crate::engine::Runner;
use crate::fs::RealFileSystem;
use crate::pipeline::{build_task_graph, Services};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the task graph and its shared services
/// - the runner for the requested task
/// - waiting on Ctrl-C while servers or watchers are up
pub async fn run(args: CliArgs) -> Result<()> {
    let config = Arc::new(config::resolve(args.config.as_deref())?);
    debug!(root = %config.root().display(), "configuration loaded");

    let services = Services::new(config, Arc::new(RealFileSystem));
    let graph = build_task_graph(&services)?;

    if args.list {
        print_task_list(&graph, &args.task)?;
        return Ok(());
    }

    let runner = Runner::new(graph);
    runner.run(&args.task).await?;

    let session = &services.session;
    if session.keeps_alive() {
        info!(task = %args.task, "servers and watchers running; press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        session.shutdown();
    }
    Ok(())
}

/// Print every task with its prerequisites, then the order `task` would run
/// in.
fn print_task_list(graph: &TaskGraph, task: &str) -> Result<()> {
    println!("tasks ({}):", graph.len());
    for name in graph.tasks() {
        let prerequisites: Vec<&str> = graph.prerequisites_of(name).collect();
        if prerequisites.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} (after: {})", prerequisites.join(", "));
        }
    }
    println!();

    if !graph.contains(task) {
        return Err(errors::FlowError::UnknownTask(task.to_string()).into());
    }
    println!("execution order for '{task}':");
    for (idx, name) in graph.execution_order(task).iter().enumerate() {
        println!("  {}. {name}", idx + 1);
    }
    Ok(())
}

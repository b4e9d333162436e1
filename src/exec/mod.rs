// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `WorkExecutor` that runs task work on Tokio tasks; tests can replace it
//!   with a fake implementation.
//! - [`command`] runs external collaborators through the platform shell with
//!   `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, WorkExecutor};
pub use command::{run_shell, shell_quote, ShellOutput};

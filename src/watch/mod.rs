// src/watch/mod.rs

//! File watching.
//!
//! - [`patterns`] compiles include/exclude glob lists (also used to select
//!   pipeline inputs).
//! - [`rules`] turns `[[watch]]` entries into checked [`WatchRule`]s.
//! - [`dispatcher`] runs the tasks of every rule an event matches.
//! - [`watcher`] wires a `notify` watcher to the dispatcher.

pub mod dispatcher;
pub mod path_utils;
pub mod patterns;
pub mod rules;
pub mod watcher;

pub use dispatcher::Dispatcher;
pub use patterns::{static_base, PatternSet};
pub use rules::{compile_rules, WatchRule};
pub use watcher::{spawn_watcher, WatcherHandle};

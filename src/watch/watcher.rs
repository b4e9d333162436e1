// src/watch/watcher.rs

use std::fmt;
use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::watch::path_utils::relative_str;
use crate::watch::Dispatcher;

/// Keeps the notify watcher and its event loop alive. Dropping the handle
/// stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch `root` recursively and hand every relevant event to `dispatcher`.
///
/// Access events and paths outside `root` are ignored.
pub fn spawn_watcher(root: impl Into<PathBuf>, dispatcher: Dispatcher) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // notify calls back on its own thread; forward into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch event loop gone; dropping event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .map_err(Error::from)?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(Error::from)?;
    info!(root = %root.display(), rules = dispatcher.rules().len(), "file watcher started");

    let loop_root = root.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            let paths: Vec<String> = event
                .paths
                .iter()
                .filter_map(|p| relative_str(&loop_root, p))
                .filter(|p| !p.is_empty())
                .collect();
            if paths.is_empty() {
                continue;
            }
            debug!(kind = ?event.kind, paths = ?paths, "filesystem event");
            dispatcher.dispatch(&paths);
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

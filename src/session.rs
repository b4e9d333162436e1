// src/session.rs

//! Long-lived resources started by tasks.
//!
//! Servers and file watchers outlive the task that started them. They are
//! parked here so the process knows to stay up after the requested task
//! finishes, and so a repeated `connect` or `watch` does not start a second
//! copy.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::server::ServerHandle;
use crate::watch::WatcherHandle;

#[derive(Debug, Default)]
pub struct Session {
    servers: Mutex<BTreeMap<String, ServerHandle>>,
    watcher: Mutex<Option<WatcherHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_server(&self, name: &str) -> bool {
        lock(&self.servers).get(name).is_some_and(|s| !s.is_finished())
    }

    pub fn add_server(&self, name: impl Into<String>, handle: ServerHandle) {
        let name = name.into();
        if let Some(previous) = lock(&self.servers).insert(name, handle) {
            previous.shutdown();
        }
    }

    pub fn server_addr(&self, name: &str) -> Option<std::net::SocketAddr> {
        lock(&self.servers).get(name).map(ServerHandle::addr)
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.watcher).is_some()
    }

    pub fn set_watcher(&self, handle: WatcherHandle) {
        *lock(&self.watcher) = Some(handle);
    }

    /// True while a server or watcher is active.
    pub fn keeps_alive(&self) -> bool {
        self.is_watching() || lock(&self.servers).values().any(|s| !s.is_finished())
    }

    /// Stop every server and drop the watcher.
    pub fn shutdown(&self) {
        let servers = std::mem::take(&mut *lock(&self.servers));
        for (name, server) in servers {
            info!(server = %name, addr = %server.addr(), "stopping server");
            server.shutdown();
        }
        lock(&self.watcher).take();
    }
}

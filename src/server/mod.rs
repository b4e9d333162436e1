// src/server/mod.rs

//! Static file servers with live reload.
//!
//! - [`http`] serves a directory (plus prefix mounts) with axum and
//!   `tower-http`, exposing the reload websocket.
//! - [`reload`] is the broadcast channel behind browser refreshes.
//! - [`open`] launches a browser on a served URL.

pub mod http;
pub mod open;
pub mod reload;

pub use http::{router, serve, ServeOptions, ServerHandle};
pub use open::open_url;
pub use reload::{inject_client, ReloadChannel, RELOAD_PATH};

// src/server/http.rs

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::body::{to_bytes, Body};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::server::reload::{inject_client, ReloadChannel, RELOAD_MESSAGE, RELOAD_PATH};

/// Largest HTML body the reload-script injection will buffer.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

/// What a static server serves and where.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Directory served at `/`.
    pub root: PathBuf,
    pub port: u16,
    /// Extra `(url prefix, directory)` mounts, e.g. third-party packages.
    pub mounts: Vec<(String, PathBuf)>,
}

impl ServeOptions {
    pub fn new(root: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            root: root.into(),
            port,
            mounts: Vec::new(),
        }
    }

    pub fn mount(mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.mounts.push((prefix.into(), dir.into()));
        self
    }
}

/// A running server. Dropping the handle leaves the server running; call
/// [`ServerHandle::shutdown`] to stop it.
pub struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Build the router: reload websocket, prefix mounts, then the root
/// directory as fallback. HTML responses get the reload client injected.
pub fn router(options: &ServeOptions, reload: ReloadChannel) -> Router {
    let mut router = Router::new().route(RELOAD_PATH, get(livereload));
    for (prefix, dir) in &options.mounts {
        router = router.nest_service(prefix, ServeDir::new(dir));
    }
    router
        .fallback_service(ServeDir::new(&options.root))
        .layer(map_response(inject_reload_script))
        .with_state(reload)
}

/// Bind `127.0.0.1:<port>` and serve in a background task.
pub async fn serve(options: ServeOptions, reload: ReloadChannel) -> Result<ServerHandle> {
    let address = SocketAddr::from(([127, 0, 0, 1], options.port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("binding HTTP server to {address}"))?;
    let addr = listener.local_addr()?;
    let app = router(&options, reload);

    info!(url = %format!("http://{addr}/"), root = %options.root.display(), "starting a HTTP server");

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(%addr, error = %err, "HTTP server stopped");
        }
    });

    Ok(ServerHandle { addr, task })
}

async fn livereload(ws: WebSocketUpgrade, State(reload): State<ReloadChannel>) -> Response {
    ws.on_upgrade(move |socket| forward_reloads(socket, reload))
}

async fn forward_reloads(mut socket: WebSocket, reload: ReloadChannel) {
    let mut rx = reload.subscribe();
    debug!(clients = reload.subscriber_count(), "live-reload client connected");

    loop {
        tokio::select! {
            notified = rx.recv() => match notified {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    if socket.send(Message::Text(RELOAD_MESSAGE.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("live-reload client disconnected");
}

async fn inject_reload_script(response: Response) -> Response {
    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

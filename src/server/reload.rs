// src/server/reload.rs

use tokio::sync::broadcast;
use tracing::debug;

/// Websocket endpoint browsers connect to for reload notifications.
pub const RELOAD_PATH: &str = "/__livereload";

/// Message pushed to every connected browser.
pub const RELOAD_MESSAGE: &str = "reload";

/// Broadcast channel shared by every server and every task with a reload
/// side effect.
///
/// Cloning is cheap; all clones talk to the same set of subscribers.
#[derive(Debug, Clone)]
pub struct ReloadChannel {
    sender: broadcast::Sender<()>,
}

impl Default for ReloadChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Tell every connected client to refresh. Never fails; with nobody
    /// listening the notification is simply dropped.
    pub fn notify(&self) {
        match self.sender.send(()) {
            Ok(receivers) => debug!(receivers, "reload broadcast"),
            Err(_) => debug!("reload requested with no connected clients"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Script injected into served HTML pages.
pub fn client_script() -> String {
    format!(
        r#"<script>
(function () {{
    var scheme = location.protocol === "https:" ? "wss://" : "ws://";
    var socket = new WebSocket(scheme + location.host + "{RELOAD_PATH}");
    socket.addEventListener("message", function (event) {{
        if (event.data === "{RELOAD_MESSAGE}") {{
            window.location.reload();
        }}
    }});
}})();
</script>"#
    )
}

/// Insert the client script before `</body>`, or append it when the page has
/// no body end tag.
pub fn inject_client(html: &str) -> String {
    let script = client_script();
    match html.rfind("</body>") {
        Some(idx) => format!("{}{}\n{}", &html[..idx], script, &html[idx..]),
        None => format!("{html}\n{script}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_listeners_is_harmless() {
        ReloadChannel::new().notify();
    }

    #[tokio::test]
    async fn every_subscriber_is_notified() {
        let channel = ReloadChannel::new();
        let mut a = channel.subscribe();
        let mut b = channel.clone().subscribe();
        channel.notify();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn script_lands_before_body_end() {
        let html = inject_client("<html><body><p>hi</p></body></html>");
        let script_at = html.find("<script>").unwrap();
        assert!(script_at < html.find("</body>").unwrap());
        assert!(html.contains(RELOAD_PATH));
    }
}

// src/server/open.rs

use std::path::Path;

use tracing::info;

use crate::errors::{FlowError, Result};
use crate::exec::{run_shell, shell_quote};

fn platform_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "start \"\""
    } else {
        "xdg-open"
    }
}

/// Open `url` in a browser through `opener` (the URL is appended), or the
/// platform default.
pub async fn open_url(opener: Option<&str>, url: &str, cwd: &Path) -> Result<()> {
    let opener = opener
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(platform_opener());
    let command = format!("{opener} {}", shell_quote(url));

    info!(url = %url, opener = %opener, "opening browser");
    let output = run_shell(&command, None, cwd).await?;
    if !output.success {
        return Err(FlowError::Other(anyhow::anyhow!(
            "`{command}` exited with {:?}: {}",
            output.code,
            output.diagnostics()
        )));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn custom_opener_receives_the_url() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("opened.txt");
        let opener = format!("echo >{}", log.display());

        open_url(Some(&opener), "http://localhost:7800/index.html", dir.path())
            .await
            .unwrap();

        let opened = std::fs::read_to_string(&log).unwrap();
        assert_eq!(opened.trim(), "http://localhost:7800/index.html");
    }
}

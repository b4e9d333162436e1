// src/exec/command.rs

//! Shell invocation of external collaborators (compilers, minifiers,
//! linters, the browser opener).

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::Result;

/// Captured result of a finished shell command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ShellOutput {
    /// Stdout and stderr joined, lossily decoded and trimmed.
    pub fn diagnostics(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Build a shell command appropriate for the platform.
fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` through the platform shell inside `cwd`, feeding `stdin` (if
/// any) and capturing stdout and stderr.
///
/// A non-zero exit is not an error here; callers decide what it means via
/// [`ShellOutput::success`]. Only failing to spawn or talk to the process is.
pub async fn run_shell(cmd: &str, stdin: Option<&[u8]>, cwd: &Path) -> Result<ShellOutput> {
    debug!(cmd = %cmd, cwd = %cwd.display(), "running external command");

    let mut command = shell(cmd);
    command
        .current_dir(cwd)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning `{cmd}`"))?;

    // Feed stdin from its own task so a large output cannot block the input.
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        let input = input.to_vec();
        let label = cmd.to_string();
        tokio::spawn(async move {
            // A command that exits without reading stdin closes the pipe
            // early; its exit status tells the real story.
            if let Err(err) = pipe.write_all(&input).await {
                debug!(cmd = %label, error = %err, "stdin closed early");
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{cmd}`"))?;

    debug!(cmd = %cmd, code = ?output.status.code(), "external command exited");

    Ok(ShellOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Quote a single argument for the platform shell.
pub fn shell_quote(arg: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@%,=".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(shell_quote("src/app.js"), "src/app.js");
        if cfg!(unix) {
            assert_eq!(shell_quote("my file.js"), "'my file.js'");
            assert_eq!(shell_quote("it's"), "'it'\\''s'");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pipes_stdin_to_stdout() {
        let out = run_shell("cat", Some(b"body { }"), Path::new("."))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, b"body { }");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_non_zero_exit() {
        let out = run_shell("echo broken >&2; exit 3", None, Path::new("."))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.diagnostics(), "broken");
    }
}

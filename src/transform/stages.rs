// src/transform/stages.rs

use std::path::PathBuf;

use tracing::{debug, info};

use crate::errors::{FlowError, Result};
use crate::exec::run_shell;
use crate::server::ReloadChannel;
use crate::transform::{Asset, PipelineEnv, Transform, TransformFuture};

/// Joins every input into a single file named `output`, in input order.
#[derive(Debug, Clone)]
pub struct Concat {
    output: String,
}

impl Concat {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Transform for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn merges_files(&self) -> bool {
        true
    }

    fn apply<'a>(&'a self, _env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a> {
        Box::pin(async move {
            if assets.is_empty() {
                return Ok(Vec::new());
            }
            let parts: Vec<&[u8]> = assets.iter().map(|a| a.contents.as_slice()).collect();
            let contents = parts.join(&b'\n');
            Ok(vec![Asset::new(&self.output, &self.output, contents)])
        })
    }
}

/// Pipes each asset through an external command (stdin -> stdout).
///
/// Without a command the stage passes assets through untouched.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    stage: String,
    command: Option<String>,
}

impl ExternalCommand {
    pub fn new(stage: impl Into<String>, command: Option<String>) -> Self {
        let command = command.filter(|c| !c.trim().is_empty());
        Self {
            stage: stage.into(),
            command,
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Run the command over a single buffer.
    pub async fn process(&self, env: &PipelineEnv, label: &str, input: &[u8]) -> Result<Vec<u8>> {
        let Some(command) = &self.command else {
            return Ok(input.to_vec());
        };
        let output = run_shell(command, Some(input), env.root()).await?;
        if !output.success {
            return Err(FlowError::transform(
                &self.stage,
                format!("{label}: `{command}` exited with {:?}\n{}", output.code, output.diagnostics()),
            ));
        }
        Ok(output.stdout)
    }
}

impl Transform for ExternalCommand {
    fn name(&self) -> &str {
        &self.stage
    }

    fn apply<'a>(&'a self, env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(assets.len());
            for mut asset in assets {
                let label = asset.relative.display().to_string();
                asset.contents = self.process(env, &label, &asset.contents).await?;
                out.push(asset);
            }
            Ok(out)
        })
    }
}

/// Writes each asset to `dir/<relative>` and passes it on.
#[derive(Debug, Clone)]
pub struct Dest {
    dir: PathBuf,
}

impl Dest {
    /// `dir` is absolute, or relative to the project root.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Transform for Dest {
    fn name(&self) -> &str {
        "dest"
    }

    fn apply<'a>(&'a self, env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a> {
        Box::pin(async move {
            let dir = env.root().join(&self.dir);
            for asset in &assets {
                let target = dir.join(&asset.relative);
                debug!(path = %target.display(), bytes = asset.contents.len(), "writing asset");
                env.fs().write(&target, &asset.contents)?;
            }
            info!(dir = %dir.display(), files = assets.len(), "assets written");
            Ok(assets)
        })
    }
}

/// Tells connected browsers to refresh once the preceding stages are done.
#[derive(Debug, Clone)]
pub struct Reload {
    channel: ReloadChannel,
}

impl Reload {
    pub fn new(channel: ReloadChannel) -> Self {
        Self { channel }
    }
}

impl Transform for Reload {
    fn name(&self) -> &str {
        "reload"
    }

    fn apply<'a>(&'a self, _env: &'a PipelineEnv, assets: Vec<Asset>) -> TransformFuture<'a> {
        Box::pin(async move {
            if !assets.is_empty() {
                self.channel.notify();
            }
            Ok(assets)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn env() -> (MockFileSystem, PipelineEnv) {
        let fs = MockFileSystem::new();
        let env = PipelineEnv::new("/project", Arc::new(fs.clone()));
        (fs, env)
    }

    #[tokio::test]
    async fn concat_joins_in_order() {
        let (_fs, env) = env();
        let assets = vec![
            Asset::new("a.js", "src/a.js", b"var a;".to_vec()),
            Asset::new("b.js", "src/b.js", b"var b;".to_vec()),
        ];
        let out = Concat::new("bundle.js").apply(&env, assets).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relative, PathBuf::from("bundle.js"));
        assert_eq!(out[0].contents, b"var a;\nvar b;");
    }

    #[tokio::test]
    async fn dest_writes_under_the_project_root() {
        let (fs, env) = env();
        let assets = vec![Asset::new("css/bundle.css", "bundle.css", b"a{}".to_vec())];
        Dest::new("_assets").apply(&env, assets).await.unwrap();
        assert_eq!(
            fs.contents("/project/_assets/css/bundle.css").as_deref(),
            Some("a{}")
        );
    }

    #[tokio::test]
    async fn command_less_stage_is_identity() {
        let (_fs, env) = env();
        let stage = ExternalCommand::new("autoprefixer", Some("  ".to_string()));
        let assets = vec![Asset::new("x.css", "x.css", b"a{}".to_vec())];
        let out = stage.apply(&env, assets.clone()).await.unwrap();
        assert_eq!(out, assets);
    }

    #[tokio::test]
    async fn reload_stage_notifies_subscribers() {
        let (_fs, env) = env();
        let channel = ReloadChannel::new();
        let mut rx = channel.subscribe();
        let assets = vec![Asset::new("x.css", "x.css", b"a{}".to_vec())];
        Reload::new(channel).apply(&env, assets).await.unwrap();
        assert!(rx.try_recv().is_ok());
    }
}

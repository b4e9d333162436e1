// src/pipeline/tasks.rs

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::dag::{noop, work_fn, TaskContext, TaskGraph, TaskGraphBuilder, TaskWork};
use crate::errors::{FlowError, Result};
use crate::fs::walk_files;
use crate::inject::Injector;
use crate::lint::{ExternalLinter, LintGate};
use crate::optimize::{Manifest, Optimizer};
use crate::pipeline::{PipelineWork, Services};
use crate::server::{open_url, serve, ServeOptions};
use crate::transform::{Concat, Dest, ExternalCommand, Pipeline, Reload, Source};
use crate::watch::{compile_rules, spawn_watcher, Dispatcher};

const NONE: [&str; 0] = [];

/// Register the complete task set.
///
/// | task | after |
/// |---|---|
/// | `compile-sass` | `lint-sass` |
/// | `compile-js` | `lint-js` |
/// | `inject` | `insert-dependencies`, `compile-sass`, `compile-js` |
/// | `optimize` | `inject` |
/// | `open-dev` | `connect-dev`, `inject` |
/// | `open-build` | `connect`, `optimize` |
/// | `default` | `fonts`, `images`, `open-dev`, `watch` |
/// | `build` | `fonts`, `images`, `open-build`, `watch` |
pub fn build_task_graph(services: &Services) -> Result<TaskGraph> {
    TaskGraphBuilder::new()
        .register("lint-sass", NONE, lint_sass(services)?)
        .register("lint-js", NONE, lint_js(services)?)
        .register("compile-sass", ["lint-sass"], compile_sass(services)?)
        .register("compile-js", ["lint-js"], compile_js(services)?)
        .register("insert-dependencies", NONE, insert_dependencies(services))
        .register(
            "inject",
            ["insert-dependencies", "compile-sass", "compile-js"],
            inject(services),
        )
        .register("optimize", ["inject"], optimize(services))
        .register("connect", NONE, connect(services))
        .register("connect-dev", NONE, connect_dev(services))
        .register("open-dev", ["connect-dev", "inject"], open_dev(services))
        .register("open-build", ["connect", "optimize"], open_build(services))
        .register("fonts", NONE, copy_assets(services, "fonts", "fonts")?)
        .register("images", NONE, copy_assets(services, "images", "img")?)
        .register("reload", NONE, reload(services))
        .register("clean-assets", NONE, clean_assets(services))
        .register("watch", NONE, watch(services))
        .register("default", ["fonts", "images", "open-dev", "watch"], noop())
        .register("build", ["fonts", "images", "open-build", "watch"], noop())
        .build()
}

fn lint_sass(services: &Services) -> Result<Arc<dyn TaskWork>> {
    let lint = &services.config.lint;
    let gate = LintGate::new(
        services.lint_caches.register("lint-sass")?,
        Arc::new(ExternalLinter::new(
            "sass-lint",
            &lint.style_command,
            &lint.style_rules,
        )),
    );
    let pipeline = Pipeline::builder("lint-sass", Source::new(lint.style.as_slice())?)
        .stage(gate)
        .build()?;
    Ok(PipelineWork::new(pipeline, services.env()))
}

fn lint_js(services: &Services) -> Result<Arc<dyn TaskWork>> {
    let lint = &services.config.lint;
    let gate = LintGate::new(
        services.lint_caches.register("lint-js")?,
        Arc::new(ExternalLinter::new(
            "eslint",
            &lint.script_command,
            &lint.script_rules,
        )),
    );
    let pipeline = Pipeline::builder("lint-js", Source::new(lint.script.as_slice())?)
        .stage(gate)
        .build()?;
    Ok(PipelineWork::new(pipeline, services.env()))
}

fn compile_sass(services: &Services) -> Result<Arc<dyn TaskWork>> {
    let config = &services.config;
    let pipeline = Pipeline::builder("compile-sass", Source::glob(&config.globs.styles)?)
        .stage(Concat::new(&config.bundle.css))
        .stage(ExternalCommand::new("sass", config.tools.sass.clone()))
        .stage(ExternalCommand::new(
            "autoprefixer",
            config.tools.autoprefixer.clone(),
        ))
        .stage(Dest::new(config.assets_subdir("css")))
        .stage(Reload::new(services.reload.clone()))
        .build()?;
    Ok(PipelineWork::new(pipeline, services.env()))
}

fn compile_js(services: &Services) -> Result<Arc<dyn TaskWork>> {
    let config = &services.config;
    let pipeline = Pipeline::builder("compile-js", Source::glob(&config.globs.scripts)?)
        .stage(Concat::new(&config.bundle.js))
        .stage(Dest::new(config.assets_subdir("js")))
        .stage(Reload::new(services.reload.clone()))
        .build()?;
    Ok(PipelineWork::new(pipeline, services.env()))
}

fn copy_assets(
    services: &Services,
    name: &str,
    subdir: &str,
) -> Result<Arc<dyn TaskWork>> {
    let config = &services.config;
    let glob = match name {
        "fonts" => &config.globs.fonts,
        _ => &config.globs.images,
    };
    let pipeline = Pipeline::builder(name, Source::glob(glob)?)
        .stage(Dest::new(config.assets_subdir(subdir)))
        .stage(Reload::new(services.reload.clone()))
        .build()?;
    Ok(PipelineWork::new(pipeline, services.env()))
}

fn insert_dependencies(services: &Services) -> Arc<dyn TaskWork> {
    let injector = Injector::new(Arc::clone(&services.config), Arc::clone(&services.fs));
    work_fn(move |_ctx: TaskContext| {
        let injector = injector.clone();
        async move { injector.insert_dependencies() }
    })
}

fn inject(services: &Services) -> Arc<dyn TaskWork> {
    let injector = Injector::new(Arc::clone(&services.config), Arc::clone(&services.fs));
    work_fn(move |_ctx: TaskContext| {
        let injector = injector.clone();
        async move { injector.inject_bundles() }
    })
}

fn optimize(services: &Services) -> Arc<dyn TaskWork> {
    let optimizer = Optimizer::new(Arc::clone(&services.config), Arc::clone(&services.fs));
    work_fn(move |_ctx: TaskContext| {
        let optimizer = optimizer.clone();
        async move {
            optimizer.run().await?;
            Ok::<_, FlowError>(())
        }
    })
}

fn connect(services: &Services) -> Arc<dyn TaskWork> {
    let config = Arc::clone(&services.config);
    let services = services.clone();
    work_fn(move |ctx: TaskContext| {
        let options = ServeOptions::new(config.build_dir(), config.server.build_port);
        start_server(services.clone(), ctx.task, options)
    })
}

fn connect_dev(services: &Services) -> Arc<dyn TaskWork> {
    let config = Arc::clone(&services.config);
    let services = services.clone();
    work_fn(move |ctx: TaskContext| {
        let options = ServeOptions::new(config.source_dir(), config.server.dev_port)
            .mount(&config.server.third_party_url, config.third_party_dir())
            .mount(&config.server.assets_url, config.assets_dir());
        start_server(services.clone(), ctx.task, options)
    })
}

async fn start_server(services: Services, name: String, options: ServeOptions) -> Result<()> {
    if services.session.has_server(&name) {
        info!(server = %name, "server already running");
        return Ok(());
    }
    let handle = serve(options, services.reload.clone()).await?;
    services.session.add_server(name, handle);
    Ok(())
}

fn open_dev(services: &Services) -> Arc<dyn TaskWork> {
    let config = Arc::clone(&services.config);
    work_fn(move |_ctx: TaskContext| {
        let config = Arc::clone(&config);
        async move {
            let url = format!("{}:{}/", config.server.base_url, config.server.dev_port);
            open_browser(&config, &url).await;
            Ok::<_, FlowError>(())
        }
    })
}

fn open_build(services: &Services) -> Arc<dyn TaskWork> {
    let config = Arc::clone(&services.config);
    let fs = Arc::clone(&services.fs);
    work_fn(move |_ctx: TaskContext| {
        let config = Arc::clone(&config);
        let fs = Arc::clone(&fs);
        async move {
            let manifest_path = config.manifest_path();
            let manifest = Manifest::load(fs.as_ref(), &manifest_path)?.ok_or_else(|| {
                FlowError::Other(anyhow::anyhow!(
                    "no usable manifest at {}",
                    manifest_path.display()
                ))
            })?;
            let index = manifest.get(config.index_key()).ok_or_else(|| {
                FlowError::Other(anyhow::anyhow!(
                    "manifest {} has no entry for {}",
                    manifest_path.display(),
                    config.index_key()
                ))
            })?;
            let url = format!(
                "{}:{}/{}",
                config.server.base_url, config.server.build_port, index
            );
            open_browser(&config, &url).await;
            Ok::<_, FlowError>(())
        }
    })
}

/// A browser that fails to open never fails the task.
async fn open_browser(config: &Config, url: &str) {
    if !config.server.open_browser {
        info!(url = %url, "serving");
        return;
    }
    if let Err(err) = open_url(config.server.opener.as_deref(), url, config.root()).await {
        warn!(url = %url, error = %err, "could not open browser");
    }
}

fn reload(services: &Services) -> Arc<dyn TaskWork> {
    let channel = services.reload.clone();
    work_fn(move |_ctx: TaskContext| {
        channel.notify();
        async { Ok::<_, FlowError>(()) }
    })
}

fn clean_assets(services: &Services) -> Arc<dyn TaskWork> {
    let config = Arc::clone(&services.config);
    let fs = Arc::clone(&services.fs);
    work_fn(move |_ctx: TaskContext| {
        let config = Arc::clone(&config);
        let fs = Arc::clone(&fs);
        async move {
            let dir = config.assets_dir();
            let files = walk_files(fs.as_ref(), &dir)?;
            for file in &files {
                fs.remove_file(file)?;
            }
            info!(dir = %dir.display(), files = files.len(), "assets cleaned");
            Ok::<_, FlowError>(())
        }
    })
}

fn watch(services: &Services) -> Arc<dyn TaskWork> {
    let services = services.clone();
    work_fn(move |ctx: TaskContext| {
        let services = services.clone();
        async move {
            if services.session.is_watching() {
                info!("watch session already running");
                return Ok(());
            }
            let runner = ctx.runner().clone();
            let rules = compile_rules(&services.config.watch, runner.graph())?;
            let handle = spawn_watcher(services.config.root(), Dispatcher::new(rules, runner))?;
            services.session.set_watcher(handle);
            Ok::<_, FlowError>(())
        }
    })
}

// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from `assetflow.toml`.
///
/// Every section is optional; omitted values fall back to the layout of a
/// conventional front-end project:
///
/// ```toml
/// [paths]
/// source = "src"
/// build = "build"
/// assets = "_assets"
///
/// [server]
/// dev_port = 7800
/// build_port = 8000
///
/// [[watch]]
/// pattern = "src/sass/**/*.scss"
/// tasks = ["compile-sass"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub packages: PackagesSection,

    #[serde(default)]
    pub lint: LintSection,

    #[serde(default)]
    pub globs: GlobsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub optimize: OptimizeSection,

    /// `[[watch]]` rules. `None` means "use the built-in rules".
    #[serde(default)]
    pub watch: Option<Vec<WatchRuleConfig>>,
}

/// Validated, immutable configuration.
///
/// Built once at startup (see [`crate::config::loader`]) and shared as
/// `Arc<Config>` with every component; nothing reads configuration from
/// ambient state.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    pub paths: PathsSection,
    pub bundle: BundleSection,
    pub server: ServerSection,
    pub packages: PackagesSection,
    pub lint: LintSection,
    pub globs: GlobsSection,
    pub tools: ToolsSection,
    pub optimize: OptimizeSection,
    pub watch: Vec<WatchRuleConfig>,
}

impl Config {
    /// Construct without validation. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(raw: RawConfig, root: PathBuf) -> Self {
        Self {
            root,
            paths: raw.paths,
            bundle: raw.bundle,
            server: raw.server,
            packages: raw.packages,
            lint: raw.lint,
            globs: raw.globs,
            tools: raw.tools,
            optimize: raw.optimize,
            watch: raw.watch.unwrap_or_else(default_watch_rules),
        }
    }

    /// Project root every relative path and glob is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.paths.source)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.paths.build)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(&self.paths.assets)
    }

    pub fn assets_subdir(&self, name: &str) -> PathBuf {
        self.assets_dir().join(name)
    }

    pub fn third_party_dir(&self) -> PathBuf {
        self.root.join(&self.paths.third_party)
    }

    /// The entry HTML file inside the source directory.
    pub fn index_path(&self) -> PathBuf {
        self.source_dir().join(self.index_key())
    }

    /// Normalised index path relative to the source directory; also the
    /// index entry's key in the revision manifest.
    pub fn index_key(&self) -> &str {
        &self.paths.index
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir().join(&self.optimize.manifest)
    }

    pub fn package_manifest_path(&self) -> PathBuf {
        self.root.join(&self.packages.manifest)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(&self.packages.directory)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Development sources, served raw by the dev server.
    pub source: String,
    /// Optimized output directory.
    pub build: String,
    /// Compiled assets (bundles, fonts, images).
    pub assets: String,
    /// Entry HTML file name, relative to `source`.
    pub index: String,
    /// Third-party packages served under `server.third_party_url`.
    pub third_party: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: "src".to_string(),
            build: "build".to_string(),
            assets: "_assets".to_string(),
            index: "index.html".to_string(),
            third_party: "bower_components".to_string(),
        }
    }
}

/// `[bundle]` section: output names of the concatenated development bundles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleSection {
    pub css: String,
    pub js: String,
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            css: "bundle.css".to_string(),
            js: "bundle.js".to_string(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub base_url: String,
    pub dev_port: u16,
    pub build_port: u16,
    /// Open the index page in a browser after `open-dev` / `open-build`.
    pub open_browser: bool,
    /// Command used to open URLs; the URL is appended. Platform default if unset.
    pub opener: Option<String>,
    pub third_party_url: String,
    pub assets_url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            dev_port: 7800,
            build_port: 8000,
            open_browser: true,
            opener: None,
            third_party_url: "/bower_components".to_string(),
            assets_url: "/_assets".to_string(),
        }
    }
}

/// `[packages]` section: the third-party package manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagesSection {
    pub manifest: String,
    pub directory: String,
    /// Prefix stripped from injected package paths.
    pub ignore_path: String,
}

impl Default for PackagesSection {
    fn default() -> Self {
        Self {
            manifest: "bower.json".to_string(),
            directory: "bower_components".to_string(),
            ignore_path: "..".to_string(),
        }
    }
}

/// `[lint]` section.
///
/// `style_command` / `script_command` are shell templates: `{rules}` is
/// replaced by the rule file, and the changed file paths are appended.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LintSection {
    pub style_rules: String,
    pub script_rules: String,
    pub style: Vec<String>,
    pub script: Vec<String>,
    pub style_command: String,
    pub script_command: String,
}

impl Default for LintSection {
    fn default() -> Self {
        Self {
            style_rules: ".sass-lint.yml".to_string(),
            script_rules: "eslint.config.json".to_string(),
            style: vec![
                "src/sass/**/*.scss".to_string(),
                "!src/sass/vendor/**/*.scss".to_string(),
            ],
            script: vec![
                "src/scripts/**/*.js".to_string(),
                "!src/scripts/vendor/**/*.js".to_string(),
            ],
            style_command: "sass-lint --config {rules} --verbose --max-warnings 0".to_string(),
            script_command: "eslint --config {rules}".to_string(),
        }
    }
}

/// `[globs]` section: one pattern per asset category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobsSection {
    pub styles: String,
    pub scripts: String,
    pub fonts: String,
    pub images: String,
    pub html: String,
    pub compiled_css: String,
    pub compiled_js: String,
}

impl Default for GlobsSection {
    fn default() -> Self {
        Self {
            styles: "src/sass/**/*.scss".to_string(),
            scripts: "src/scripts/**/*.js".to_string(),
            fonts: "src/fonts/**/*".to_string(),
            images: "src/images/**/*".to_string(),
            html: "src/**/*.html".to_string(),
            compiled_css: "_assets/css/**/*.css".to_string(),
            compiled_js: "_assets/js/**/*.js".to_string(),
        }
    }
}

/// `[tools]` section: external transform commands (stdin -> stdout).
///
/// An absent or empty command turns the corresponding stage into a
/// pass-through.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub sass: Option<String>,
    pub autoprefixer: Option<String>,
    pub css_minifier: Option<String>,
    pub js_minifier: Option<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: Some("sass --stdin --scss --embed-source-map".to_string()),
            autoprefixer: Some("postcss --use autoprefixer".to_string()),
            css_minifier: Some("csso".to_string()),
            js_minifier: Some("uglifyjs --compress --mangle".to_string()),
        }
    }
}

/// `[optimize]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizeSection {
    /// Build-block target file name minified as the library stream.
    pub library_bundle: String,
    /// Build-block target file name minified as the application stream.
    pub application_bundle: String,
    /// Manifest file name inside the build directory.
    pub manifest: String,
}

impl Default for OptimizeSection {
    fn default() -> Self {
        Self {
            library_bundle: "lib.js".to_string(),
            application_bundle: "app.js".to_string(),
            manifest: "rev-manifest.json".to_string(),
        }
    }
}

/// One `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchRuleConfig {
    pub pattern: String,
    pub tasks: Vec<String>,
}

impl WatchRuleConfig {
    pub fn new(pattern: impl Into<String>, tasks: &[&str]) -> Self {
        Self {
            pattern: pattern.into(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

fn default_watch_rules() -> Vec<WatchRuleConfig> {
    vec![
        WatchRuleConfig::new("src/**/*.html", &["reload"]),
        WatchRuleConfig::new("src/images/**/*", &["images"]),
        WatchRuleConfig::new("src/fonts/**/*", &["fonts"]),
        WatchRuleConfig::new("src/sass/**/*.scss", &["compile-sass"]),
        WatchRuleConfig::new("src/scripts/**/*.js", &["compile-js"]),
    ]
}

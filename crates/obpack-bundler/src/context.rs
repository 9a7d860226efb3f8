//! The bundler collaborator: one configuration, any number of builds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use obpack_config::{BundleConfig, OutputFormat, Platform, SourceMapPolicy};
use path_clean::PathClean;
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, IsExternal,
    ResolveOptions, SourceMapType,
};
use rolldown_common::{AddonOutputOption, TreeshakeOptions};
use tokio::sync::Mutex;

use crate::output::{self, WrittenFile};
use crate::plugins;
use crate::watch::{self, WatchHandle, WatchOptions};
use crate::{Error, Result};

/// What one build wrote.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outputs: Vec<WrittenFile>,
    pub duration: Duration,
    /// Number of non-fatal diagnostics rolldown reported.
    pub warnings: usize,
}

impl BuildReport {
    /// The stylesheet written by this build, if any component had styles.
    pub fn stylesheet(&self) -> Option<&WrittenFile> {
        self.outputs
            .iter()
            .find(|f| f.path.extension().is_some_and(|e| e == "css"))
    }

    pub fn total_size(&self) -> u64 {
        self.outputs.iter().map(|f| f.size).sum()
    }
}

/// A handle the orchestrator drives builds through.
#[async_trait]
pub trait BuildHandle: Send + Sync + 'static {
    /// Run one complete build and write every output.
    ///
    /// Returns only after all outputs are in place. Calling it repeatedly is
    /// safe; each call starts from the sources on disk.
    async fn rebuild(&self) -> Result<BuildReport>;

    /// Rebuild whenever sources under `options.root` change.
    fn watch(self: Arc<Self>, options: WatchOptions) -> Result<WatchHandle>
    where
        Self: Sized,
    {
        watch::spawn(self, options)
    }
}

/// Rolldown-backed [`BuildHandle`].
///
/// A fresh rolldown bundler is created for every build; concurrent
/// [`rebuild`](BuildHandle::rebuild) calls are serialized so two builds never
/// write the same outputs at once.
#[derive(Debug)]
pub struct BuildContext {
    config: BundleConfig,
    cwd: PathBuf,
    lock: Mutex<()>,
}

impl BuildContext {
    /// Create a context for the project rooted at `cwd`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn new(config: BundleConfig, cwd: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;

        let cwd = cwd.as_ref();
        let cwd = if cwd.is_absolute() {
            cwd.clean()
        } else {
            std::env::current_dir()?.join(cwd).clean()
        };

        Ok(Self {
            config,
            cwd,
            lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn entry_path(&self) -> PathBuf {
        self.cwd.join(&self.config.entry).clean()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.cwd.join(self.config.out_dir()).clean()
    }

    /// Absolute paths every build may write, for watcher ignore lists.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let paths = self.config.stylesheet_paths();
        vec![
            self.cwd.join(&self.config.outfile).clean(),
            self.cwd.join(paths.emitted).clean(),
            self.cwd.join(paths.target).clean(),
        ]
    }

    fn bundler_options(&self) -> BundlerOptions {
        let config = &self.config;

        let mut options = BundlerOptions {
            input: Some(vec![InputItem {
                name: Some(config.output_name()),
                import: self.entry_path().to_string_lossy().into_owned(),
            }]),
            cwd: Some(self.cwd.clone()),
            format: Some(match config.format {
                OutputFormat::Cjs => rolldown::OutputFormat::Cjs,
                OutputFormat::Esm => rolldown::OutputFormat::Esm,
            }),
            platform: Some(match config.platform {
                Platform::Node => rolldown::Platform::Node,
                Platform::Browser => rolldown::Platform::Browser,
            }),
            sourcemap: match config.sourcemap {
                SourceMapPolicy::Disabled => None,
                SourceMapPolicy::Inline => Some(SourceMapType::Inline),
            },
            external: Some(IsExternal::from(config.external.clone())),
            banner: Some(AddonOutputOption::String(Some(config.banner.js.clone()))),
            resolve: Some(resolve_options(&self.cwd)),
            ..Default::default()
        };

        // esnext is rolldown's default target; nothing to lower.
        options.treeshake = TreeshakeOptions::Boolean(config.tree_shaking);
        options
    }
}

#[async_trait]
impl BuildHandle for BuildContext {
    async fn rebuild(&self) -> Result<BuildReport> {
        let _guard = self.lock.lock().await;
        let start = Instant::now();

        let entry = self.entry_path();
        if !entry.is_file() {
            return Err(Error::EntryNotFound(entry));
        }

        tracing::debug!(entry = %entry.display(), out_dir = %self.out_dir().display(), "starting build");

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(self.bundler_options())
            .with_plugins(plugins::plugins_for(&self.config))
            .build()
            .map_err(|e| Error::from_rolldown_batch(&e))?;

        let bundle = bundler
            .generate()
            .await
            .map_err(|e| Error::from_rolldown_batch(&e))?;

        for warning in &bundle.warnings {
            tracing::warn!("{warning:?}");
        }

        let files = output::collect_outputs(&bundle);
        let outputs = output::write_outputs(&files, &self.out_dir(), &self.config.banner.css)?;

        let report = BuildReport {
            outputs,
            duration: start.elapsed(),
            warnings: bundle.warnings.len(),
        };

        tracing::debug!(
            files = report.outputs.len(),
            bytes = report.total_size(),
            ms = report.duration.as_millis() as u64,
            "build finished"
        );

        Ok(report)
    }
}

/// Node-style resolution: `node_modules` up the tree from `cwd`.
fn resolve_options(cwd: &Path) -> ResolveOptions {
    let mut modules: Vec<String> = cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").to_string_lossy().into_owned())
        .collect();
    modules.push("node_modules".to_string());

    ResolveOptions {
        main_fields: Some(vec!["module".to_string(), "main".to_string()]),
        condition_names: Some(vec![
            "node".to_string(),
            "import".to_string(),
            "require".to_string(),
            "default".to_string(),
        ]),
        extensions: Some(
            [".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".json"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

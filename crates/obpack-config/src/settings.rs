//! Project-level overrides loaded from `obpack.toml` and the environment.
//!
//! Sources are merged lowest to highest: built-in defaults, the project file
//! (or an explicit `--config` path), then `OBPACK_*` environment variables.
//! Nested keys use a double underscore in the environment, e.g.
//! `OBPACK_DEV__DEBOUNCE_MS=250` or `OBPACK_BANNER__JS="/* x */"`.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::bundle::BundleConfig;
use crate::error::{ConfigError, Result};

/// File looked up in the project root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "obpack.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "OBPACK_";

/// Default quiet period between a source change and the rebuild it triggers.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// What the development loop does when renaming the stylesheet fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameFailurePolicy {
    /// Stop the loop and exit non-zero.
    #[default]
    Fatal,
    /// Log a warning and keep watching.
    Warn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BannerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

/// Settings that only affect the development loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevSettings {
    pub debounce_ms: u64,
    /// Directory watched for source changes. Defaults to the entry's parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_root: Option<PathBuf>,
    /// Extra path fragments ignored by the source watcher.
    pub watch_ignore: Vec<String>,
    pub on_rename_error: RenameFailurePolicy,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            watch_root: None,
            watch_ignore: Vec::new(),
            on_rename_error: RenameFailurePolicy::default(),
        }
    }
}

/// User-controlled overrides on top of [`build_config`](crate::build_config).
///
/// Mode-dependent fields (log level, source map) are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outfile: Option<PathBuf>,
    /// Appended to the built-in externals.
    pub external: Vec<String>,
    pub banner: BannerOverrides,
    pub dev: DevSettings,
}

impl ProjectSettings {
    /// Load settings for the project rooted at `root`.
    ///
    /// An explicit `config_path` must exist; the implicit `obpack.toml` is
    /// optional. Relative explicit paths are resolved against `root`.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                Some(path)
            }
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                default_path.is_file().then_some(default_path)
            }
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "loading project settings");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let settings: Self = figment.extract()?;
        Ok(settings)
    }

    /// Apply these overrides to a mode's base configuration.
    pub fn apply(&self, config: BundleConfig) -> BundleConfig {
        let mut config = config.with_extra_externals(self.external.iter().cloned());

        if let Some(entry) = &self.entry {
            config = config.with_entry(entry.clone());
        }
        if let Some(outfile) = &self.outfile {
            config = config.with_outfile(outfile.clone());
        }

        let mut banners = config.banner.clone();
        if let Some(js) = &self.banner.js {
            banners.js = js.clone();
        }
        if let Some(css) = &self.banner.css {
            banners.css = css.clone();
        }
        config.with_banners(banners)
    }
}

//! Bundling intent for one process invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::banner::Banners;
use crate::error::{ConfigError, Result};
use crate::externals::default_externals;
use crate::mode::Mode;

/// Default entry point, relative to the project root.
pub const DEFAULT_ENTRY: &str = "src/main.ts";

/// Default bundle location, relative to the project root.
pub const DEFAULT_OUTFILE: &str = "plugin/main.js";

/// Conventional name the host application loads styles from.
pub const STYLESHEET_NAME: &str = "styles.css";

/// Module format of the JavaScript output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CommonJS (`require` / `module.exports`), what the host loads.
    Cjs,
    /// ECMAScript modules.
    Esm,
}

/// Language level of the emitted JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Latest syntax, no down-leveling.
    EsNext,
}

/// Runtime the bundle executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Node,
    Browser,
}

/// Verbosity of build logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Source map generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapPolicy {
    /// No source map at all.
    Disabled,
    /// Base64 data URL appended to the bundle.
    Inline,
}

/// Plugins the bundler applies, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// Single-file component (`.vue`) support.
    VueSfc,
}

/// How files with a given extension become modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    /// Default export is a `data:` URL of the file.
    DataUrl,
    /// Default export is the file content as a string.
    Text,
    /// Default export is the base64-encoded file content.
    Base64,
}

/// Everything the bundler needs to know for one build.
///
/// Built once per process by [`build_config`]. The `with_*` methods return a
/// modified copy; a value is never changed in place once handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    pub bundle: bool,
    pub entry: PathBuf,
    pub external: Vec<String>,
    pub outfile: PathBuf,
    pub banner: Banners,
    pub format: OutputFormat,
    pub target: Target,
    pub platform: Platform,
    pub log_level: LogLevel,
    pub sourcemap: SourceMapPolicy,
    pub tree_shaking: bool,
    pub plugins: Vec<PluginKind>,
    /// Keyed by extension including the leading dot (`".svg"`).
    pub loader: BTreeMap<String, Loader>,
}

/// Construct the bundle configuration for `mode`.
///
/// Only the log level and the source map policy depend on the mode.
pub fn build_config(mode: Mode) -> BundleConfig {
    let (log_level, sourcemap) = match mode {
        Mode::Release => (LogLevel::Info, SourceMapPolicy::Disabled),
        Mode::Development => (LogLevel::Debug, SourceMapPolicy::Inline),
    };

    BundleConfig {
        bundle: true,
        entry: PathBuf::from(DEFAULT_ENTRY),
        external: default_externals(),
        outfile: PathBuf::from(DEFAULT_OUTFILE),
        banner: Banners::default(),
        format: OutputFormat::Cjs,
        target: Target::EsNext,
        platform: Platform::Node,
        log_level,
        sourcemap,
        tree_shaking: true,
        plugins: vec![PluginKind::VueSfc],
        loader: BTreeMap::from([(".svg".to_string(), Loader::DataUrl)]),
    }
}

/// Where the bundler writes the stylesheet and where it has to end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetPaths {
    /// Named after the entry, e.g. `plugin/main.css`.
    pub emitted: PathBuf,
    /// Conventional location, e.g. `plugin/styles.css`.
    pub target: PathBuf,
}

impl BundleConfig {
    pub fn with_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_outfile(mut self, outfile: impl Into<PathBuf>) -> Self {
        self.outfile = outfile.into();
        self
    }

    pub fn with_banners(mut self, banner: Banners) -> Self {
        self.banner = banner;
        self
    }

    /// Append externals, skipping names already present.
    pub fn with_extra_externals<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            let name = name.into();
            if !self.external.contains(&name) {
                self.external.push(name);
            }
        }
        self
    }

    /// Directory the outputs are written to.
    pub fn out_dir(&self) -> &Path {
        self.outfile
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Bundle name, the outfile's stem (`main` for `plugin/main.js`).
    pub fn output_name(&self) -> String {
        self.outfile
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string())
    }

    /// Stylesheet paths derived from the outfile.
    pub fn stylesheet_paths(&self) -> StylesheetPaths {
        StylesheetPaths {
            emitted: self.outfile.with_extension("css"),
            target: self.out_dir().join(STYLESHEET_NAME),
        }
    }

    /// Check the structural invariants of the configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` when the entry or outfile is unusable
    /// - `StylesheetCollision` when the emitted stylesheet would already be
    ///   named `styles.css`
    pub fn validate(&self) -> Result<()> {
        if self.entry.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entry".to_string(),
                hint: "an entry point is required".to_string(),
            });
        }

        match self.outfile.extension().and_then(|e| e.to_str()) {
            Some("js") => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "outfile".to_string(),
                    hint: format!("'{}' must be a .js file", self.outfile.display()),
                });
            }
        }

        let paths = self.stylesheet_paths();
        if paths.emitted == paths.target {
            return Err(ConfigError::StylesheetCollision(paths.emitted));
        }

        if let Some(bad) = self.external.iter().find(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "external".to_string(),
                hint: format!("empty module name {bad:?}"),
            });
        }

        for ext in self.loader.keys() {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(ConfigError::InvalidValue {
                    field: "loader".to_string(),
                    hint: format!("extension {ext:?} must look like \".svg\""),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_quiet_and_mapless() {
        let config = build_config(Mode::Release);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.sourcemap, SourceMapPolicy::Disabled);
    }

    #[test]
    fn development_is_verbose_with_inline_maps() {
        let config = build_config(Mode::Development);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.sourcemap, SourceMapPolicy::Inline);
    }

    #[test]
    fn same_mode_gives_same_config() {
        for mode in [Mode::Release, Mode::Development] {
            assert_eq!(build_config(mode), build_config(mode));
        }
    }

    #[test]
    fn modes_differ_only_in_log_level_and_sourcemap() {
        let release = build_config(Mode::Release);
        let dev = build_config(Mode::Development);

        assert_eq!(release.bundle, dev.bundle);
        assert_eq!(release.entry, dev.entry);
        assert_eq!(release.external, dev.external);
        assert_eq!(release.outfile, dev.outfile);
        assert_eq!(release.banner, dev.banner);
        assert_eq!(release.format, dev.format);
        assert_eq!(release.target, dev.target);
        assert_eq!(release.platform, dev.platform);
        assert_eq!(release.tree_shaking, dev.tree_shaking);
        assert_eq!(release.plugins, dev.plugins);
        assert_eq!(release.loader, dev.loader);

        // Catches fields added later without a mode decision.
        let aligned = BundleConfig {
            log_level: dev.log_level,
            sourcemap: dev.sourcemap,
            ..release
        };
        assert_eq!(aligned, dev);
    }

    #[test]
    fn stylesheet_paths_follow_outfile() {
        let config = build_config(Mode::Release);
        let paths = config.stylesheet_paths();
        assert_eq!(paths.emitted, PathBuf::from("plugin/main.css"));
        assert_eq!(paths.target, PathBuf::from("plugin/styles.css"));

        let root = config.with_outfile("main.js");
        let paths = root.stylesheet_paths();
        assert_eq!(paths.emitted, PathBuf::from("main.css"));
        assert_eq!(paths.target, PathBuf::from("./styles.css"));
        assert_eq!(root.out_dir(), Path::new("."));
    }

    #[test]
    fn output_name_is_outfile_stem() {
        let config = build_config(Mode::Development).with_outfile("dist/bundle.js");
        assert_eq!(config.output_name(), "bundle");
    }

    #[test]
    fn defaults_validate() {
        build_config(Mode::Release).validate().unwrap();
        build_config(Mode::Development).validate().unwrap();
    }

    #[test]
    fn styles_outfile_is_rejected() {
        let config = build_config(Mode::Release).with_outfile("plugin/styles.js");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StylesheetCollision(_))
        ));
    }

    #[test]
    fn non_js_outfile_is_rejected() {
        let config = build_config(Mode::Release).with_outfile("plugin/main.mjs");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "outfile"
        ));
    }

    #[test]
    fn extra_externals_are_deduplicated() {
        let base = build_config(Mode::Release);
        let before = base.external.len();
        let config = base.with_extra_externals(["obsidian", "moment"]);
        assert_eq!(config.external.len(), before + 1);
        assert_eq!(config.external.last().map(String::as_str), Some("moment"));
    }

    #[test]
    fn log_level_directives() {
        assert_eq!(LogLevel::Info.as_directive(), "info");
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
        assert!(LogLevel::Debug > LogLevel::Info);
    }
}

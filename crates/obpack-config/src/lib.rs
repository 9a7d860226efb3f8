//! Configuration for obpack builds.
//!
//! [`Mode`] is read from the command line, [`build_config`] turns it into a
//! [`BundleConfig`], and [`ProjectSettings`] layers `obpack.toml` and
//! `OBPACK_*` overrides on top.

mod banner;
mod bundle;
mod error;
mod externals;
mod mode;
mod settings;

pub use banner::{Banners, CSS_BANNER, JS_BANNER};
pub use bundle::{
    BundleConfig, DEFAULT_ENTRY, DEFAULT_OUTFILE, LogLevel, Loader, OutputFormat, Platform,
    PluginKind, STYLESHEET_NAME, SourceMapPolicy, StylesheetPaths, Target, build_config,
};
pub use error::{ConfigError, Result};
pub use externals::{HOST_MODULES, NODE_BUILTINS, default_externals};
pub use mode::{Mode, RELEASE_ARG};
pub use settings::{
    BannerOverrides, CONFIG_FILE_NAME, DEFAULT_DEBOUNCE_MS, DevSettings, ENV_PREFIX,
    ProjectSettings, RenameFailurePolicy,
};

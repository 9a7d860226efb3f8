//! # obpack-bundler
//!
//! Rolldown-backed bundling for obpack.
//!
//! [`BuildContext`] turns an [`obpack_config::BundleConfig`] into rolldown
//! options and writes the outputs next to the configured outfile. It
//! implements [`BuildHandle`], the seam the command line orchestrates
//! through: one complete build per [`BuildHandle::rebuild`] call, or
//! continuous rebuilding via [`BuildHandle::watch`].
//!
//! ```no_run
//! use obpack_bundler::{BuildContext, BuildHandle};
//! use obpack_config::{Mode, build_config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = BuildContext::new(build_config(Mode::Release), ".")?;
//! let report = ctx.rebuild().await?;
//! for file in &report.outputs {
//!     println!("{} ({} bytes)", file.path.display(), file.size);
//! }
//! # Ok(()) }
//! ```

use std::path::PathBuf;

pub mod context;
pub mod output;
pub mod plugins;
pub mod watch;

pub use context::{BuildContext, BuildHandle, BuildReport};
pub use output::{OutputFile, WrittenFile};
pub use plugins::{LoaderPlugin, VueSfcPlugin};
pub use watch::{BuildEvent, WatchHandle, WatchOptions};

// Re-exported for plugin tests and downstream crates.
pub use rolldown_common::ModuleType;
pub use rolldown_plugin::{HookLoadArgs, HookResolveIdArgs, Plugin, PluginContext};

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for obpack-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rolldown reported one or more diagnostics.
    #[error("Rolldown bundler error: {0}")]
    Bundler(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] obpack_config::ConfigError),

    #[error("Entry point not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output path escapes the output directory.
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Wrap a rolldown batch of diagnostics.
    ///
    /// Rolldown's batched diagnostics only expose a `Debug` rendering that is
    /// stable enough to show to users.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(format!("{error:?}"))
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundler(_) => "BUNDLER_ERROR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Watch(_) => "WATCH_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(_) => Some(Box::new(
                "Check obpack.toml and OBPACK_* environment variables.",
            )),
            Error::EntryNotFound(path) => Some(Box::new(format!(
                "Create '{}' or set `entry` in obpack.toml.",
                path.display()
            ))),
            Error::InvalidOutputPath(_) => Some(Box::new(
                "Outputs must stay inside the outfile's directory.",
            )),
            Error::WriteFailure(_) => Some(Box::new(
                "Failed to write file. Check disk space and permissions.",
            )),
            Error::Watch(_) => Some(Box::new(
                "The OS file watcher could not be started. Check inotify limits or directory permissions.",
            )),
            _ => None,
        }
    }
}

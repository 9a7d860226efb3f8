//! Error types for the obpack CLI.
//!
//! [`CliError`] is what every command returns. Lower layers convert into it
//! through `#[from]`, and [`cli_error_to_miette`] turns it into the report
//! `main` prints.
//!
//! Messages that have an obvious fix carry a `Hint:` line.

use std::path::PathBuf;

use thiserror::Error;

mod report;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// `obpack.toml`, `--config` or `OBPACK_*` could not be turned into settings.
    #[error("Configuration error: {0}")]
    Config(#[from] obpack_config::ConfigError),

    /// The bundler failed to produce or write outputs.
    #[error(transparent)]
    Build(#[from] obpack_bundler::Error),

    /// Moving the emitted stylesheet to its final name failed.
    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}\n\nHint: Check inotify limits or directory permissions")]
    Watch(#[from] notify::Error),

    /// The stylesheet event stream ended, which only happens if the OS
    /// watcher went away.
    #[error("Stylesheet watcher stopped unexpectedly")]
    WatcherClosed,
}

/// Failure to move `<stem>.css` to `styles.css`.
#[derive(Debug, Error)]
pub enum RenameError {
    /// Nothing to rename: the bundle contained no stylesheet.
    #[error(
        "No stylesheet was emitted at {}\n\nHint: The host loads styles.css; import a stylesheet or a component with a <style> block",
        .0.display()
    )]
    SourceMissing(PathBuf),

    #[error("Failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Failed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

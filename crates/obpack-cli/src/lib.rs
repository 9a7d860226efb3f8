//! obpack - a build orchestrator for host-application plugins.
//!
//! The binary parses its arguments with [`cli::Cli`], resolves a
//! [`BundleConfig`](obpack_config::BundleConfig) for the selected mode, and
//! hands it to [`commands::release`] or [`commands::dev`].
//!
//! The orchestration steps are usable without the binary:
//!
//! - [`plan_release`] builds once through any
//!   [`BuildHandle`](obpack_bundler::BuildHandle) and renames the stylesheet.
//! - [`plan_development`] starts a watch and returns a [`DevSession`] that
//!   yields one [`RenameOutcome`] per stylesheet change.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod stylesheet;
pub mod ui;

pub use commands::{DevSession, ReleaseSummary, plan_development, plan_release};
pub use error::{CliError, RenameError, Result};
pub use stylesheet::{
    ChangeEvent, ChangeKind, RenameOutcome, StylesheetRename, StylesheetWatcher, rename_stream,
};

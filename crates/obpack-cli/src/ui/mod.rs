//! Terminal output: status lines, a spinner, and size/duration formatting.
//!
//! Everything here writes to stderr.
//!
//! ```no_run
//! use obpack_cli::ui;
//!
//! ui::init_colors(true);
//! let spinner = ui::Spinner::new("Building plugin...");
//! spinner.finish("Built");
//! ui::success("Stylesheet ready");
//! ```

mod format;
mod messages;
mod spinner;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, format_size};
pub use messages::{debug, error, info, success, warning};
pub use spinner::Spinner;

static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Decide once whether status lines are colored.
///
/// `allowed` is false when `--no-color` was passed; the environment and
/// terminal detection in [`crate::logger::should_use_colors`] apply on top.
pub fn init_colors(allowed: bool) {
    COLORS.store(allowed && crate::logger::should_use_colors(), Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

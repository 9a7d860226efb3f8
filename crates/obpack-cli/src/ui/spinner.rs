//! Spinner for the release build.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use super::colors_enabled;

/// Spinner shown while a build runs.
///
/// Hidden when stderr is not a terminal, so piped and CI output stays clean.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    ///
    /// ```no_run
    /// use obpack_cli::ui::Spinner;
    ///
    /// let spinner = Spinner::new("Building plugin...");
    /// spinner.finish("Built");
    /// ```
    pub fn new(message: &str) -> Self {
        let pb = if console::user_attended_stderr() && !super::is_ci() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒"]);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Finish with a check mark.
    pub fn finish(&self, message: &str) {
        let mark = if colors_enabled() {
            "✓".green().to_string()
        } else {
            "✓".to_string()
        };
        self.pb.finish_with_message(format!("{mark} {message}"));
    }

    /// Finish with a cross.
    pub fn fail(&self, message: &str) {
        let mark = if colors_enabled() {
            "✗".red().to_string()
        } else {
            "✗".to_string()
        };
        self.pb.finish_with_message(format!("{mark} {message}"));
    }
}

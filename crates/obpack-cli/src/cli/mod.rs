//! Command-line interface definition.
//!
//! `obpack [MODE] [--cwd DIR] [--config FILE] [--no-color]`
//!
//! `MODE` is free-form on purpose: exactly `release` selects a release
//! build and anything else, including nothing or an unknown `-flag`,
//! selects development.

use std::path::PathBuf;

use clap::Parser;
use obpack_config::Mode;

use crate::error::{CliError, Result};

/// obpack - build host-application plugins
#[derive(Parser, Debug)]
#[command(
    name = "obpack",
    version,
    about = "Build a plugin bundle, once for release or continuously for development",
    long_about = "Bundles src/main.ts into plugin/main.js and moves the emitted stylesheet to\n\
                  plugin/styles.css. `obpack release` builds once and exits; any other\n\
                  invocation watches sources and rebuilds until interrupted."
)]
pub struct Cli {
    /// `release` for a one-shot production build; anything else watches
    #[arg(value_name = "MODE", allow_hyphen_values = true)]
    pub mode: Option<String>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Settings file to use instead of `<root>/obpack.toml`
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Extra arguments passed along by package scripts; ignored.
    #[arg(hide = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        Mode::from_arg(self.mode.as_deref())
    }

    /// Absolute project root.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `--cwd` does not name a directory.
    pub fn project_root(&self) -> Result<PathBuf> {
        let current = std::env::current_dir()?;
        let root = match &self.cwd {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => current.join(dir),
            None => current,
        };

        if !root.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "--cwd {} is not a directory",
                root.display()
            )));
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn release_mode() {
        assert_eq!(parse(&["obpack", "release"]).mode(), Mode::Release);
    }

    #[test]
    fn anything_else_is_development() {
        assert_eq!(parse(&["obpack"]).mode(), Mode::Development);
        assert_eq!(parse(&["obpack", "dev"]).mode(), Mode::Development);
        assert_eq!(parse(&["obpack", "Release"]).mode(), Mode::Development);
        assert_eq!(parse(&["obpack", "production", "extra"]).mode(), Mode::Development);
    }

    #[test]
    fn only_first_argument_counts() {
        let cli = parse(&["obpack", "dev", "release"]);
        assert_eq!(cli.mode(), Mode::Development);
        assert_eq!(cli.rest, vec!["release".to_string()]);
    }

    #[test]
    fn flags() {
        let cli = parse(&["obpack", "release", "--cwd", "proj", "--config", "ci.toml", "--no-color"]);
        assert_eq!(cli.cwd, Some(PathBuf::from("proj")));
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(cli.no_color);
    }

    #[test]
    fn dash_mode_is_development() {
        assert_eq!(parse(&["obpack", "-r"]).mode(), Mode::Development);
        assert_eq!(parse(&["obpack", "--watch"]).mode(), Mode::Development);

        let cli = parse(&["obpack", "--watch", "--minify"]);
        assert_eq!(cli.mode.as_deref(), Some("--watch"));
        assert_eq!(cli.rest, vec!["--minify".to_string()]);
    }

    #[test]
    fn known_flags_still_parse_next_to_dash_values() {
        let cli = parse(&["obpack", "-r", "--no-color", "--cwd", "proj"]);
        assert_eq!(cli.mode.as_deref(), Some("-r"));
        assert!(cli.no_color);
        assert_eq!(cli.cwd, Some(PathBuf::from("proj")));
        assert!(cli.rest.is_empty());

        let cli = parse(&["obpack", "--no-color", "release"]);
        assert_eq!(cli.mode(), Mode::Release);
    }

    #[test]
    fn missing_cwd_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let cli = parse(&["obpack", "--cwd", missing.to_str().unwrap()]);
        assert!(matches!(cli.project_root(), Err(CliError::InvalidArgument(_))));
    }
}

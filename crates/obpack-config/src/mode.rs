//! Build mode selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal argument that selects a release build.
pub const RELEASE_ARG: &str = "release";

/// Whether the process packages a release once or keeps rebuilding.
///
/// Decided once from the command line and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One optimized build without source maps, then exit.
    Release,
    /// Continuous rebuilding with inline source maps.
    #[default]
    Development,
}

impl Mode {
    /// Determine the mode from a full argument list (program name first).
    ///
    /// Only the first argument after the program name is inspected. It must
    /// be exactly `"release"`; anything else, including no argument at all,
    /// selects [`Mode::Development`].
    ///
    /// ```
    /// use obpack_config::Mode;
    ///
    /// assert_eq!(Mode::from_args(["obpack", "release"]), Mode::Release);
    /// assert_eq!(Mode::from_args(["obpack"]), Mode::Development);
    /// assert_eq!(Mode::from_args(["obpack", "Release"]), Mode::Development);
    /// ```
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter().skip(1);
        let first = args.next();
        Self::from_arg(first.as_ref().map(AsRef::as_ref))
    }

    /// Determine the mode from the single positional mode argument.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(RELEASE_ARG) => Mode::Release,
            _ => Mode::Development,
        }
    }

    pub fn is_release(self) -> bool {
        matches!(self, Mode::Release)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Release => write!(f, "release"),
            Mode::Development => write!(f, "development"),
        }
    }
}

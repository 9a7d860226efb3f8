//! Logging setup for the obpack binary.
//!
//! The configuration's [`LogLevel`] picks the default level for the obpack
//! crates; `RUST_LOG` replaces the filter entirely when set.
//!
//! ```rust,no_run
//! use obpack_cli::logger::init_logger;
//! use obpack_config::LogLevel;
//!
//! init_logger(LogLevel::Debug, false);
//! tracing::debug!("watching");
//! ```

use obpack_config::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events the default filter lets through.
const TARGETS: &[&str] = &["obpack", "obpack_cli", "obpack_bundler", "obpack_config"];

/// Filter directives for `level`, e.g. `obpack_cli=debug,obpack_bundler=debug,...`.
pub fn default_directives(level: LogLevel) -> String {
    let level = level.as_directive();
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once, before any logging.
///
/// Logs go to stderr so stdout stays free for tools that pipe it.
pub fn init_logger(level: LogLevel, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// `NO_COLOR` wins, then `FORCE_COLOR`, then whether stderr is a terminal.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

//! Miette report conversion for CLI errors.

use miette::Report;

use crate::error::CliError;

/// Convert a [`CliError`] into the report printed by `main`.
///
/// Bundler errors keep their diagnostic code and help text.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn build_errors_keep_diagnostic_code() {
        let report = cli_error_to_miette(CliError::Build(obpack_bundler::Error::EntryNotFound(
            PathBuf::from("src/main.ts"),
        )));
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("ENTRY_NOT_FOUND"));
    }

    #[test]
    fn other_errors_keep_message() {
        let report = cli_error_to_miette(CliError::InvalidArgument("--cwd".to_string()));
        assert_eq!(report.to_string(), "Invalid argument: --cwd");
    }
}

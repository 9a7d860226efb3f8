//! One-shot production build.

use std::path::{Path, PathBuf};

use obpack_bundler::{BuildContext, BuildHandle, BuildReport};
use obpack_config::BundleConfig;

use crate::error::Result;
use crate::stylesheet::StylesheetRename;
use crate::ui;

/// What a successful release produced.
#[derive(Debug, Clone)]
pub struct ReleaseSummary {
    pub report: BuildReport,
    /// Final location of the stylesheet.
    pub stylesheet: PathBuf,
}

/// Build once, then rename the stylesheet.
///
/// The rename only starts after [`BuildHandle::rebuild`] has returned, so
/// every output is complete on disk.
///
/// # Errors
///
/// Any build error, or a [`RenameError`](crate::error::RenameError). A bundle
/// with no stylesheet is an error here: the host would load stale or no
/// styles.
pub async fn plan_release<H>(handle: &H, rename: &StylesheetRename) -> Result<ReleaseSummary>
where
    H: BuildHandle + ?Sized,
{
    let report = handle.rebuild().await?;
    let stylesheet = rename.rename_now()?;
    Ok(ReleaseSummary { report, stylesheet })
}

/// Run a release build for the project at `cwd`, reporting progress.
pub async fn execute(config: BundleConfig, cwd: &Path) -> Result<()> {
    let context = BuildContext::new(config, cwd)?;
    let rename = StylesheetRename::for_config(context.config(), context.cwd());
    let cwd = context.cwd();

    tracing::info!(entry = %context.entry_path().display(), "release build");
    let spinner = ui::Spinner::new("Building plugin...");

    match plan_release(&context, &rename).await {
        Ok(summary) => {
            spinner.finish(&format!(
                "Built {} file(s), {} in {}",
                summary.report.outputs.len(),
                ui::format_size(summary.report.total_size()),
                ui::format_duration(summary.report.duration)
            ));
            for file in &summary.report.outputs {
                ui::debug(&format!("  {}", display_relative(&file.path, cwd)));
            }
            ui::success(&format!(
                "Stylesheet: {}",
                display_relative(&summary.stylesheet, cwd)
            ));
            Ok(())
        }
        Err(err) => {
            spinner.fail("Release build failed");
            Err(err)
        }
    }
}

pub(crate) fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_display() {
        assert_eq!(
            display_relative(Path::new("/p/plugin/styles.css"), Path::new("/p")),
            "plugin/styles.css"
        );
        assert_eq!(display_relative(Path::new("/q/a"), Path::new("/p")), "/q/a");
    }
}

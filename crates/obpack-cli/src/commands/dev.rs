//! Development loop.
//!
//! Two watchers run side by side: the build context's source watcher
//! rebuilds on source changes, and a [`StylesheetWatcher`] renames the
//! emitted stylesheet whenever a rebuild writes it. The loop ends on Ctrl+C
//! or, under the `fatal` policy, on the first rename error.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use obpack_bundler::{BuildContext, BuildEvent, BuildHandle, WatchHandle, WatchOptions};
use obpack_config::{BundleConfig, DevSettings, RenameFailurePolicy};
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::{Stream, StreamExt};

use crate::commands::release::display_relative;
use crate::error::{CliError, Result};
use crate::stylesheet::{RenameOutcome, StylesheetRename, StylesheetWatcher, rename_stream};
use crate::ui;

type RenameResults = Pin<Box<dyn Stream<Item = Result<RenameOutcome>> + Send>>;

/// A running development session.
///
/// Dropping it stops both watchers.
pub struct DevSession {
    watch: WatchHandle,
    renames: RenameResults,
}

impl DevSession {
    /// Wait for the next stylesheet change and its outcome.
    ///
    /// Returns `None` only if the OS watcher went away.
    pub async fn next(&mut self) -> Option<Result<RenameOutcome>> {
        self.renames.next().await
    }

    /// Build events, starting from when the session was planned.
    ///
    /// The first call returns the receiver created when the watch started,
    /// so the initial build is included; later calls subscribe fresh.
    pub fn take_build_events(&mut self) -> broadcast::Receiver<BuildEvent> {
        self.watch.take_events()
    }

    pub fn watch_root(&self) -> &Path {
        self.watch.root()
    }

    pub fn stop(self) {
        self.watch.stop();
    }
}

impl std::fmt::Debug for DevSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevSession")
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

/// Start watching: sources through `handle`, the stylesheet through `rename`.
///
/// The stylesheet watcher is registered before the source watch starts so
/// the initial build's stylesheet is not missed. Must be called from within
/// a tokio runtime.
///
/// # Errors
///
/// Fails if either OS watcher cannot start.
pub fn plan_development<H>(
    handle: Arc<H>,
    rename: StylesheetRename,
    options: WatchOptions,
) -> Result<DevSession>
where
    H: BuildHandle,
{
    let stylesheet = StylesheetWatcher::new(rename.from())?;
    let watch = handle.watch(options)?;

    Ok(DevSession {
        watch,
        renames: Box::pin(rename_stream(stylesheet.events(), rename)),
    })
}

/// Source-watch options for `context` under `dev` settings.
///
/// The default root is the entry's directory; the build's own outputs are
/// always ignored.
pub fn watch_options(context: &BuildContext, dev: &DevSettings) -> WatchOptions {
    let root = match &dev.watch_root {
        Some(root) => context.cwd().join(root),
        None => context
            .entry_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| context.cwd().to_path_buf()),
    };

    WatchOptions::new(root)
        .debounce(Duration::from_millis(dev.debounce_ms))
        .ignore(dev.watch_ignore.iter().cloned())
        .ignore_paths(context.output_paths())
}

/// Run the development loop for the project at `cwd` until Ctrl+C.
pub async fn execute(config: BundleConfig, dev: &DevSettings, cwd: &Path) -> Result<()> {
    let context = Arc::new(BuildContext::new(config, cwd)?);
    let cwd = context.cwd().to_path_buf();
    let rename = StylesheetRename::for_config(context.config(), &cwd);
    let options = watch_options(&context, dev);

    let mut session = plan_development(Arc::clone(&context), rename, options)?;
    let mut builds = session.take_build_events();

    ui::info(&format!(
        "Watching {} (Ctrl+C to stop)",
        display_relative(session.watch_root(), &cwd)
    ));

    loop {
        tokio::select! {
            outcome = session.next() => match outcome {
                Some(Ok(RenameOutcome::Renamed(to))) => {
                    ui::success(&format!("Stylesheet: {}", display_relative(&to, &cwd)));
                }
                Some(Ok(RenameOutcome::Skipped)) => {
                    tracing::debug!("no stylesheet to rename");
                }
                Some(Err(err)) => match dev.on_rename_error {
                    RenameFailurePolicy::Fatal => return Err(err),
                    RenameFailurePolicy::Warn => ui::warning(&err.to_string()),
                },
                None => return Err(CliError::WatcherClosed),
            },
            Some(event) = next_build_event(&mut builds) => report_build(&event, &cwd),
            _ = signal::ctrl_c() => {
                ui::info("Stopping");
                break;
            }
        }
    }

    session.stop();
    Ok(())
}

async fn next_build_event(rx: &mut broadcast::Receiver<BuildEvent>) -> Option<BuildEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "build events lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

fn report_build(event: &BuildEvent, cwd: &Path) {
    match event {
        BuildEvent::Started { trigger: None } => ui::info("Building..."),
        BuildEvent::Started {
            trigger: Some(path),
        } => ui::info(&format!("Rebuilding ({} changed)", display_relative(path, cwd))),
        BuildEvent::Completed { files, duration_ms } => ui::success(&format!(
            "Built {files} file(s) in {}",
            ui::format_duration(Duration::from_millis(*duration_ms))
        )),
        BuildEvent::Failed { error } => ui::error(error),
    }
}

//! Moving the emitted stylesheet to the name the host application loads.
//!
//! The bundler names its CSS after the entry (`plugin/main.css`); the host
//! only reads `plugin/styles.css`. Release builds rename once. Development
//! watches the emitted path and renames after every rebuild that writes it.
//!
//! The watcher side is a plain [`Stream`] of [`ChangeEvent`]s, and
//! [`StylesheetRename::handle_change`] is the only step with side effects,
//! so the whole loop can be driven by synthetic events in tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use obpack_config::BundleConfig;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};

use crate::error::{CliError, RenameError, Result};

/// What happened to the watched path, as far as the OS told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Other,
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            _ => ChangeKind::Other,
        }
    }
}

/// One notification for the watched stylesheet.
///
/// Notifications can be stale or duplicated; handlers must re-check the
/// file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Result of handling one [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The stylesheet now lives at this path.
    Renamed(PathBuf),
    /// Nothing was at the source path when the event was handled.
    Skipped,
}

/// The `{from, to}` pair for one build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetRename {
    from: PathBuf,
    to: PathBuf,
}

impl StylesheetRename {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Paths for `config`, anchored at the project root.
    pub fn for_config(config: &BundleConfig, cwd: &Path) -> Self {
        let paths = config.stylesheet_paths();
        Self::new(cwd.join(paths.emitted), cwd.join(paths.target))
    }

    pub fn from(&self) -> &Path {
        &self.from
    }

    pub fn to(&self) -> &Path {
        &self.to
    }

    /// Rename unconditionally, replacing any previous `to`.
    ///
    /// # Errors
    ///
    /// `SourceMissing` if there is nothing at `from`, `Failed` for any other
    /// I/O error.
    pub fn rename_now(&self) -> Result<PathBuf, RenameError> {
        match fs::rename(&self.from, &self.to) {
            Ok(()) => {
                tracing::debug!(from = %self.from.display(), to = %self.to.display(), "renamed stylesheet");
                Ok(self.to.clone())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.from.exists() => {
                Err(RenameError::SourceMissing(self.from.clone()))
            }
            Err(source) => Err(RenameError::Failed {
                from: self.from.clone(),
                to: self.to.clone(),
                source,
            }),
        }
    }

    /// Check that the source exists, then rename it.
    ///
    /// An absent source is [`RenameOutcome::Skipped`], never an error: the
    /// event may describe a removal, or a previous event already moved it.
    pub fn handle_change(&self, event: &ChangeEvent) -> Result<RenameOutcome, RenameError> {
        tracing::debug!(path = %event.path.display(), kind = ?event.kind, "stylesheet event");

        if !self.from.is_file() {
            return Ok(RenameOutcome::Skipped);
        }

        match self.rename_now() {
            Ok(to) => Ok(RenameOutcome::Renamed(to)),
            // Lost a race with another event for the same write.
            Err(RenameError::SourceMissing(_)) => Ok(RenameOutcome::Skipped),
            Err(e) => Err(e),
        }
    }
}

/// Apply `rename` to every event of `events`, in order.
///
/// Errors from the event source pass through unchanged; rename errors are
/// wrapped as [`CliError::Rename`]. The caller decides whether either ends
/// the loop.
pub fn rename_stream<S>(events: S, rename: StylesheetRename) -> impl Stream<Item = Result<RenameOutcome>>
where
    S: Stream<Item = Result<ChangeEvent>>,
{
    events.map(move |event| {
        let event = event?;
        Ok(rename.handle_change(&event)?)
    })
}

/// OS notifications for a single file.
///
/// Watches the file's parent directory (non-recursively) so the file may be
/// created, replaced, or removed freely.
pub struct StylesheetWatcher {
    path: PathBuf,
    rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: RecommendedWatcher,
}

impl StylesheetWatcher {
    /// Start watching `path`. Its parent directory is created if missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path.file_name().ok_or_else(|| {
            CliError::InvalidArgument(format!("not a file path: {}", path.display()))
        })?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        // Notify reports canonical paths; compare against the same form.
        let dir = dir.canonicalize()?;
        let path = dir.join(file_name);

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>(64);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the stream was dropped.
            let _ = tx.blocking_send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::debug!(path = %path.display(), "watching stylesheet");

        Ok(Self { path, rx, watcher })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turn the watcher into a stream of events for its path.
    ///
    /// The stream never ends on its own; dropping it stops the OS watcher.
    pub fn events(self) -> impl Stream<Item = Result<ChangeEvent>> + Send + 'static {
        let Self {
            path,
            mut rx,
            watcher,
        } = self;

        async_stream::stream! {
            let _watcher = watcher;
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        if event.kind.is_access() || !event.paths.iter().any(|p| *p == path) {
                            continue;
                        }
                        yield Ok(ChangeEvent::new(path.clone(), ChangeKind::from(&event.kind)));
                    }
                    Err(e) => yield Err(CliError::Watch(e)),
                }
            }
        }
    }
}

impl std::fmt::Debug for StylesheetWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylesheetWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

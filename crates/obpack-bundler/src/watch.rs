//! Source watching: rebuild whenever inputs change.
//!
//! A recursive `notify` watcher feeds paths into a tokio task. The task waits
//! for a quiet period of `debounce` after the last change, runs one
//! [`BuildHandle::rebuild`], and broadcasts the outcome as [`BuildEvent`]s.
//! Build failures are reported and the watch continues.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::context::BuildHandle;
use crate::{Error, Result};

/// Default quiet period before a rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Path fragments ignored unless overridden.
pub const DEFAULT_IGNORE: &[&str] = &["node_modules"];

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory watched recursively.
    pub root: PathBuf,
    pub debounce: Duration,
    /// Directory names or `*.ext` patterns, relative to `root`.
    pub ignore: Vec<String>,
    /// Exact files to ignore, typically the build's own outputs.
    pub ignore_paths: Vec<PathBuf>,
    /// Build once before waiting for the first change.
    pub initial_build: bool,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            ignore_paths: Vec::new(),
            initial_build: true,
        }
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Add patterns on top of the defaults.
    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn ignore_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.ignore_paths.extend(paths);
        self
    }

    pub fn initial_build(mut self, initial_build: bool) -> Self {
        self.initial_build = initial_build;
        self
    }
}

/// Lifecycle of one watched build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// `trigger` is the last changed path, `None` for the initial build.
    Started { trigger: Option<PathBuf> },
    Completed { files: usize, duration_ms: u64 },
    Failed { error: String },
}

/// A running watch. Dropping it stops watching.
pub struct WatchHandle {
    root: PathBuf,
    events: broadcast::Sender<BuildEvent>,
    /// Subscribed before the task started; sees the initial build.
    initial: Option<broadcast::Receiver<BuildEvent>>,
    task: JoinHandle<()>,
    _watcher: RecommendedWatcher,
}

impl WatchHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Receive build events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.events.subscribe()
    }

    /// Build events from the start of the watch.
    ///
    /// The first call returns the receiver created before the watch task
    /// was spawned, so no event of the initial build is missed. Later calls
    /// behave like [`subscribe`](Self::subscribe).
    pub fn take_events(&mut self) -> broadcast::Receiver<BuildEvent> {
        self.initial.take().unwrap_or_else(|| self.events.subscribe())
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("root", &self.root)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start watching `options.root` and rebuilding through `handle`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Fails if the root is not a directory or the OS watcher cannot start.
pub fn spawn<H>(handle: Arc<H>, options: WatchOptions) -> Result<WatchHandle>
where
    H: BuildHandle + ?Sized,
{
    if !options.root.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("watch root '{}' is not a directory", options.root.display()),
        )));
    }

    let root = options.root.canonicalize()?;
    let ignore = options.ignore.clone();
    let ignore_paths: Vec<PathBuf> = options.ignore_paths.iter().map(|p| normalize(p)).collect();

    let (tx, rx) = mpsc::channel::<PathBuf>(256);
    let filter_root = root.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "source watcher error");
                return;
            }
        };

        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }

        for path in event.paths {
            if should_ignore(&path, &filter_root, &ignore, &ignore_paths) {
                continue;
            }
            // Receiver gone means the watch was stopped.
            let _ = tx.blocking_send(path);
        }
    })?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    let (events, initial) = broadcast::channel(64);
    let task = tokio::spawn(run(
        handle,
        rx,
        events.clone(),
        options.debounce,
        options.initial_build,
    ));

    tracing::info!(root = %root.display(), "watching for changes");

    Ok(WatchHandle {
        root,
        events,
        initial: Some(initial),
        task,
        _watcher: watcher,
    })
}

async fn run<H>(
    handle: Arc<H>,
    mut changes: mpsc::Receiver<PathBuf>,
    events: broadcast::Sender<BuildEvent>,
    debounce: Duration,
    initial_build: bool,
) where
    H: BuildHandle + ?Sized,
{
    if initial_build {
        build_once(handle.as_ref(), &events, None).await;
    }

    while let Some(mut trigger) = changes.recv().await {
        loop {
            match tokio::time::timeout(debounce, changes.recv()).await {
                Ok(Some(path)) => trigger = path,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        tracing::debug!(path = %trigger.display(), "source changed");
        build_once(handle.as_ref(), &events, Some(trigger)).await;
    }
}

async fn build_once<H>(handle: &H, events: &broadcast::Sender<BuildEvent>, trigger: Option<PathBuf>)
where
    H: BuildHandle + ?Sized,
{
    // Nobody listening is fine.
    let _ = events.send(BuildEvent::Started { trigger });
    let start = Instant::now();

    match handle.rebuild().await {
        Ok(report) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::info!(files = report.outputs.len(), ms = duration_ms, "rebuilt");
            let _ = events.send(BuildEvent::Completed {
                files: report.outputs.len(),
                duration_ms,
            });
        }
        Err(e) => {
            tracing::error!(error = %e, "rebuild failed");
            let _ = events.send(BuildEvent::Failed {
                error: e.to_string(),
            });
        }
    }
}

/// Canonicalize as much of `path` as exists.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn should_ignore(path: &Path, root: &Path, patterns: &[String], exact: &[PathBuf]) -> bool {
    if exact.iter().any(|p| p == path) {
        return true;
    }

    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    let path_str = rel_path.to_string_lossy();

    // Writer temp files.
    if path_str.ends_with(".tmp") {
        return true;
    }

    for pattern in patterns {
        if let Some(ext) = pattern.strip_prefix('*') {
            if path_str.ends_with(ext) {
                return true;
            }
        } else if rel_path
            .components()
            .any(|c| c.as_os_str() == pattern.as_str())
            || path_str.starts_with(pattern.as_str())
        {
            return true;
        }
    }

    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BuildReport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ignores_node_modules() {
        let root = Path::new("/project");
        let patterns = vec!["node_modules".to_string()];
        assert!(should_ignore(
            Path::new("/project/node_modules/pkg/index.js"),
            root,
            &patterns,
            &[]
        ));
        assert!(!should_ignore(Path::new("/project/src/main.ts"), root, &patterns, &[]));
    }

    #[test]
    fn ignores_extension_patterns() {
        let root = Path::new("/project");
        let patterns = vec!["*.log".to_string()];
        assert!(should_ignore(Path::new("/project/debug.log"), root, &patterns, &[]));
        assert!(!should_ignore(Path::new("/project/src/a.ts"), root, &patterns, &[]));
    }

    #[test]
    fn ignores_hidden_and_outside_and_temp() {
        let root = Path::new("/project");
        assert!(should_ignore(Path::new("/project/.git/HEAD"), root, &[], &[]));
        assert!(should_ignore(Path::new("/project/src/.cache/x"), root, &[], &[]));
        assert!(should_ignore(Path::new("/other/file.ts"), root, &[], &[]));
        assert!(should_ignore(Path::new("/project/main.js.tmp"), root, &[], &[]));
    }

    #[test]
    fn ignores_own_outputs() {
        let root = Path::new("/project");
        let outputs = vec![PathBuf::from("/project/main.js")];
        assert!(should_ignore(Path::new("/project/main.js"), root, &[], &outputs));
        assert!(!should_ignore(Path::new("/project/main.ts"), root, &[], &outputs));
    }

    #[test]
    fn options_builder() {
        let options = WatchOptions::new("/p")
            .debounce(Duration::from_millis(5))
            .ignore(["dist"])
            .initial_build(false);
        assert_eq!(options.debounce, Duration::from_millis(5));
        assert_eq!(options.ignore, vec!["node_modules".to_string(), "dist".to_string()]);
        assert!(!options.initial_build);
    }

    #[derive(Default)]
    struct CountingHandle {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl BuildHandle for CountingHandle {
        async fn rebuild(&self) -> Result<BuildReport> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(BuildReport {
                outputs: Vec::new(),
                duration: Duration::ZERO,
                warnings: 0,
            })
        }
    }

    #[tokio::test]
    async fn burst_of_changes_triggers_one_rebuild() {
        let handle = Arc::new(CountingHandle::default());
        let (tx, rx) = mpsc::channel(16);
        let (events, mut sub) = broadcast::channel(16);

        let task = tokio::spawn(run(
            Arc::clone(&handle),
            rx,
            events,
            Duration::from_millis(20),
            false,
        ));

        for i in 0..5 {
            tx.send(PathBuf::from(format!("/p/src/{i}.ts"))).await.unwrap();
        }

        assert_eq!(
            sub.recv().await.unwrap(),
            BuildEvent::Started {
                trigger: Some(PathBuf::from("/p/src/4.ts"))
            }
        );
        assert!(matches!(sub.recv().await.unwrap(), BuildEvent::Completed { .. }));
        assert_eq!(handle.builds.load(Ordering::SeqCst), 1);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn initial_build_runs_first() {
        let handle = Arc::new(CountingHandle::default());
        let (tx, rx) = mpsc::channel(1);
        let (events, mut sub) = broadcast::channel(16);
        let task = tokio::spawn(run(Arc::clone(&handle), rx, events, DEFAULT_DEBOUNCE, true));

        assert_eq!(sub.recv().await.unwrap(), BuildEvent::Started { trigger: None });
        drop(tx);
        task.await.unwrap();
        assert_eq!(handle.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn taken_events_include_the_initial_build() {
        let dir = tempfile::tempdir().unwrap();
        let handle = Arc::new(CountingHandle::default());

        let mut watch = spawn(Arc::clone(&handle), WatchOptions::new(dir.path())).unwrap();
        // Let the task run ahead of the caller.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut events = watch.take_events();

        assert_eq!(events.recv().await.unwrap(), BuildEvent::Started { trigger: None });
        assert!(matches!(events.recv().await.unwrap(), BuildEvent::Completed { .. }));
        assert_eq!(handle.builds.load(Ordering::SeqCst), 1);

        // Only the first call gets the early receiver.
        let mut later = watch.take_events();
        assert!(matches!(
            later.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        watch.stop();
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let handle = Arc::new(CountingHandle::default());
        let err = spawn(handle, WatchOptions::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! Filesystem change watching
//!
//! Notification backends are usually non-recursive, so the watcher subscribes
//! every directory of the tree individually and picks up new directories as
//! their creation is observed. Qualifying events arm a [`Debouncer`]; when it
//! fires, one rescan runs inside the watcher task.

use futures::stream::{self, BoxStream, StreamExt};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::debounce::Debouncer;
use crate::error::{CatalogError, Result};
use crate::scanner::{is_skipped_dir_name, walk_filtered, Scanner};

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File or directory created
    Create,
    /// File or directory removed
    Remove,
    /// Content changed
    Modify,
    /// Renamed or moved
    Rename,
    /// Permissions, timestamps or other metadata only
    Metadata,
    /// Read access (open/close without change)
    Access,
    /// Backend could not classify the change
    Other,
}

/// A single filesystem change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened
    pub kind: ChangeKind,
    /// Affected paths
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    /// Create an event
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// Whether this change should schedule a rescan
    #[must_use]
    pub fn is_qualifying(&self) -> bool {
        !matches!(self.kind, ChangeKind::Metadata | ChangeKind::Access)
    }

    /// Whether this change may have brought a new directory into the tree
    fn may_add_directory(&self) -> bool {
        matches!(self.kind, ChangeKind::Create | ChangeKind::Rename)
    }
}

impl From<notify::Event> for ChangeEvent {
    fn from(event: notify::Event) -> Self {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Metadata,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
            EventKind::Modify(_) => ChangeKind::Modify,
            EventKind::Access(_) => ChangeKind::Access,
            EventKind::Any | EventKind::Other => ChangeKind::Other,
        };
        Self::new(kind, event.paths)
    }
}

/// A per-directory change notification facility
pub trait ChangeSource: Send {
    /// Start receiving changes for entries directly inside `path`
    fn subscribe(&mut self, path: &Path) -> Result<()>;

    /// The event stream. It ends once the source is closed. Only the first
    /// call returns live events; later calls return an empty stream.
    fn events(&mut self) -> BoxStream<'static, ChangeEvent>;

    /// Release the subscription
    fn close(&mut self);
}

/// [`ChangeSource`] backed by the platform's recommended `notify` watcher
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    events: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
}

impl NotifySource {
    /// Open the notification channel. `root` only labels errors.
    pub fn open(root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    // Receiver gone means the watcher loop has ended.
                    let _ = tx.send(ChangeEvent::from(event));
                }
                Err(e) => warn!(error = %e, "Filesystem watcher error"),
            }
        })
        .map_err(|e| CatalogError::Watch {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            watcher: Some(watcher),
            events: Some(rx),
        })
    }
}

impl ChangeSource for NotifySource {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        let watcher = self.watcher.as_mut().ok_or_else(|| CatalogError::Watch {
            path: path.to_path_buf(),
            reason: "watcher is closed".to_string(),
        })?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| CatalogError::Watch {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn events(&mut self) -> BoxStream<'static, ChangeEvent> {
        match self.events.take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn close(&mut self) {
        // Dropping the watcher drops the callback's sender, ending the stream.
        self.watcher = None;
    }
}

/// Watches the tree under a scanner's root and rescans on debounced changes
pub struct ChangeWatcher<S> {
    source: S,
    scanner: Scanner,
    debouncer: Debouncer,
}

impl<S: ChangeSource + 'static> ChangeWatcher<S> {
    /// Create a watcher; nothing is subscribed until [`Self::subscribe_tree`]
    pub fn new(source: S, scanner: Scanner, delay: Duration) -> Self {
        Self {
            source,
            scanner,
            debouncer: Debouncer::new(delay),
        }
    }

    /// Subscribe `dir` and every non-skipped directory below it.
    ///
    /// Failure to subscribe `dir` itself is returned; failures deeper in the
    /// tree are logged and skipped. Returns the number of directories
    /// subscribed.
    pub fn subscribe_tree(&mut self, dir: &Path) -> Result<usize> {
        let mut count = 0;
        for item in walk_filtered(dir) {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CatalogError::Watch {
                        path: dir.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Cannot list directory for watching");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            match self.source.subscribe(entry.path()) {
                Ok(()) => {
                    debug!(dir = %entry.path().display(), "Watching directory");
                    count += 1;
                }
                Err(e) if entry.depth() == 0 => return Err(e),
                Err(e) => warn!(error = %e, "Directory will not be watched"),
            }
        }
        Ok(count)
    }

    /// Run until `shutdown` is cancelled or the event stream ends, then close
    /// the source. A rescan in progress is allowed to finish.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut events = self.source.events();
        info!(
            root = %self.scanner.root().display(),
            delay_ms = self.debouncer.delay().as_millis() as u64,
            "Change watcher started"
        );

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Change watcher shutting down");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => self.handle_event(&event),
                    None => {
                        warn!("Change notifications ended; catalog frozen at last scan");
                        break;
                    }
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.debouncer.tick(Instant::now()) {
                        rescan(&self.scanner).await;
                    }
                }
            }
        }

        self.source.close();
    }

    fn handle_event(&mut self, event: &ChangeEvent) {
        if !event.is_qualifying() {
            return;
        }

        if event.may_add_directory() {
            for path in &event.paths {
                self.subscribe_new_directory(path);
            }
        }

        debug!(kind = ?event.kind, paths = ?event.paths, "Filesystem change");
        self.debouncer.event(Instant::now());
    }

    fn subscribe_new_directory(&mut self, path: &Path) {
        if !path.is_dir() {
            return;
        }
        if path.file_name().is_some_and(is_skipped_dir_name) {
            return;
        }
        if let Err(e) = self.subscribe_tree(path) {
            warn!(error = %e, "New directory will not be watched");
        }
    }
}

async fn rescan(scanner: &Scanner) {
    info!("File change detected, rescanning...");
    match scanner.rescan().await {
        Ok(count) => info!("Rescan complete: {} skills", count),
        Err(e) => error!("Rescan failed, keeping previous catalog: {}", e),
    }
}

/// Synthetic [`ChangeSource`] for tests
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Channel-backed source. Subscribing a path listed in `failing` returns
    /// a watch error.
    pub(crate) struct FakeSource {
        subscribed: Arc<Mutex<Vec<PathBuf>>>,
        closed: Arc<AtomicBool>,
        failing: Vec<PathBuf>,
        events: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
    }

    pub(crate) struct FakeHandle {
        pub(crate) subscribed: Arc<Mutex<Vec<PathBuf>>>,
        pub(crate) closed: Arc<AtomicBool>,
        pub(crate) tx: mpsc::UnboundedSender<ChangeEvent>,
    }

    impl FakeHandle {
        pub(crate) fn subscribed(&self) -> Vec<PathBuf> {
            self.subscribed.lock().unwrap().clone()
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn fake_source() -> (FakeSource, FakeHandle) {
        failing_source(Vec::new())
    }

    pub(crate) fn failing_source(failing: Vec<PathBuf>) -> (FakeSource, FakeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscribed = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        (
            FakeSource {
                subscribed: Arc::clone(&subscribed),
                closed: Arc::clone(&closed),
                failing,
                events: Some(rx),
            },
            FakeHandle {
                subscribed,
                closed,
                tx,
            },
        )
    }

    impl ChangeSource for FakeSource {
        fn subscribe(&mut self, path: &Path) -> Result<()> {
            if self.failing.iter().any(|p| p == path) {
                return Err(CatalogError::Watch {
                    path: path.to_path_buf(),
                    reason: "permission denied".to_string(),
                });
            }
            self.subscribed.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn events(&mut self) -> BoxStream<'static, ChangeEvent> {
            match self.events.take() {
                Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
                None => stream::empty().boxed(),
            }
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}

//! Indexer lifecycle
//!
//! Owns the catalog store for one root, performs the startup scan and runs
//! the change watcher task until shutdown.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::query::Catalog;
use crate::scanner::Scanner;
use crate::store::CatalogStore;
use crate::watcher::{ChangeSource, ChangeWatcher, NotifySource};

/// Default delay between the last filesystem change and the rescan
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Catalog indexer for a single root directory
pub struct Indexer {
    root: PathBuf,
    debounce: Duration,
    store: CatalogStore,
    shutdown: CancellationToken,
    watcher: Option<JoinHandle<()>>,
}

impl Indexer {
    /// Create an indexer for `root`. Relative roots are made absolute against
    /// the current directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root,
            debounce: DEFAULT_DEBOUNCE,
            store: CatalogStore::new(),
            shutdown: CancellationToken::new(),
            watcher: None,
        }
    }

    /// Set the debounce delay
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Indexed root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Query handle over this indexer's catalog
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone())
    }

    /// Whether the change watcher task is running
    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Scan the root and start watching it with the platform notifier.
    ///
    /// The returned error reports a failed initial scan; the watcher is
    /// started regardless. Watcher failures are logged and leave the catalog
    /// frozen at the last successful scan.
    pub async fn start(&mut self) -> Result<usize> {
        let source = NotifySource::open(&self.root);
        self.start_inner(source).await
    }

    /// Like [`Self::start`], with a caller-supplied notification source
    pub async fn start_with_source<S: ChangeSource + 'static>(
        &mut self,
        source: S,
    ) -> Result<usize> {
        self.start_inner(Ok(source)).await
    }

    async fn start_inner<S: ChangeSource + 'static>(
        &mut self,
        source: Result<S>,
    ) -> Result<usize> {
        let scanner = Scanner::new(&self.root, self.store.clone());

        // Subscribe before scanning so changes made during the scan are seen.
        let watcher = source.and_then(|source| {
            let mut watcher = ChangeWatcher::new(source, scanner.clone(), self.debounce);
            let dirs = watcher.subscribe_tree(&self.root)?;
            info!("Watching {} directories under {}", dirs, self.root.display());
            Ok(watcher)
        });

        let scanned = scanner.rescan().await;
        if let Err(e) = &scanned {
            warn!(
                "Initial scan failed: {}. Make sure {} exists.",
                e,
                self.root.display()
            );
        }

        match watcher {
            Ok(watcher) => {
                if let Some(previous) = self.watcher.take() {
                    previous.abort();
                }
                self.watcher = Some(tokio::spawn(watcher.run(self.shutdown.clone())));
            }
            Err(e) => warn!("Live updates disabled, serving last successful scan: {}", e),
        }

        scanned
    }

    /// Stop the watcher and wait for it to release its subscription
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.watcher.take() {
            if let Err(e) = handle.await {
                warn!("Change watcher task failed: {}", e);
            }
        }
        info!("Indexer for {} stopped", self.root.display());
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

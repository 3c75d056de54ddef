//! In-memory catalog store
//!
//! Holds exactly one live snapshot. Writers swap in a complete replacement;
//! readers clone the `Arc` and never see a partial update. The lock is held
//! only for the pointer copy or assignment.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::entry::Snapshot;

struct Live {
    snapshot: Arc<Snapshot>,
    generation: u64,
}

/// Shared handle to the live catalog snapshot
#[derive(Clone)]
pub struct CatalogStore {
    live: Arc<RwLock<Live>>,
}

impl CatalogStore {
    /// Create a store holding an empty snapshot (generation 0)
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: Arc::new(RwLock::new(Live {
                snapshot: Arc::new(Vec::new()),
                generation: 0,
            })),
        }
    }

    /// Atomically install a new snapshot, returning its generation
    pub async fn replace(&self, snapshot: Snapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let mut live = self.live.write().await;
        live.snapshot = snapshot;
        live.generation += 1;
        live.generation
    }

    /// Current snapshot
    pub async fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.live.read().await.snapshot)
    }

    /// Number of successful replacements so far
    pub async fn generation(&self) -> u64 {
        self.live.read().await.generation
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

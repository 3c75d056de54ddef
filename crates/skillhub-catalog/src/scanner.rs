//! Directory scanning
//!
//! Walks the root depth-first, recognizes bundle directories by their
//! descriptor file and builds a complete replacement snapshot.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::entry::{CatalogEntry, Snapshot};
use crate::error::{CatalogError, Result};
use crate::metadata::parse_descriptor;
use crate::store::CatalogStore;

/// Descriptor file name, matched case-insensitively
pub const DESCRIPTOR_FILE: &str = "SKILL.md";

/// Directory names never descended into
pub const NOISE_DIRS: &[&str] = &["__pycache__", "node_modules"];

/// True if a directory with this name is excluded from scans, watches and trees
pub fn is_skipped_dir_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || NOISE_DIRS.contains(&name.as_ref())
}

/// True if a file name is the descriptor file
pub fn is_descriptor(name: &OsStr) -> bool {
    name.to_string_lossy().eq_ignore_ascii_case(DESCRIPTOR_FILE)
}

/// Walker over `root` that prunes skipped directories. The root itself is
/// never pruned.
pub(crate) fn walk_filtered(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !(e.file_type().is_dir() && is_skipped_dir_name(e.file_name()))
        })
}

/// Scan `root` and return a fresh snapshot. Blocking.
///
/// Bundles that fail to parse are logged and left out. Only a failure to
/// read the root itself is returned as an error.
pub fn scan_root(root: &Path) -> Result<Snapshot> {
    let started = Instant::now();

    std::fs::read_dir(root).map_err(|e| CatalogError::io(root, e))?;

    let mut snapshot = Vec::new();
    let mut bundle_dirs = HashSet::new();

    for item in walk_filtered(root) {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(walk_error(root, err)),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable path during scan");
                continue;
            }
        };

        if entry.file_type().is_dir() || !is_descriptor(entry.file_name()) {
            continue;
        }

        let Some(bundle_dir) = entry.path().parent() else {
            continue;
        };
        if !bundle_dirs.insert(bundle_dir.to_path_buf()) {
            debug!(path = %entry.path().display(), "Ignoring second descriptor in bundle");
            continue;
        }

        match load_entry(root, bundle_dir, entry.path()) {
            Ok(catalog_entry) => {
                debug!(
                    name = %catalog_entry.name(),
                    path = %catalog_entry.relative_path,
                    "Indexed skill"
                );
                snapshot.push(catalog_entry);
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Skipping skill bundle"),
        }
    }

    warn_duplicate_names(&snapshot);

    info!(
        "Indexed {} skills from {} in {:?}",
        snapshot.len(),
        root.display(),
        started.elapsed()
    );
    Ok(snapshot)
}

fn walk_error(root: &Path, err: walkdir::Error) -> CatalogError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    CatalogError::io(path, source)
}

/// Read and parse one bundle's descriptor
fn load_entry(root: &Path, bundle_dir: &Path, descriptor: &Path) -> Result<CatalogEntry> {
    let bytes = std::fs::read(descriptor).map_err(|e| CatalogError::io(descriptor, e))?;
    let content = String::from_utf8_lossy(&bytes);
    let parsed = parse_descriptor(&content, descriptor)?;

    let modified = std::fs::metadata(descriptor)
        .and_then(|m| m.modified())
        .map_err(|e| CatalogError::io(descriptor, e))?;

    Ok(CatalogEntry {
        metadata: parsed.metadata,
        absolute_path: bundle_dir.to_path_buf(),
        descriptor_path: descriptor.to_path_buf(),
        relative_path: relative_path(root, bundle_dir),
        last_modified: DateTime::<Utc>::from(modified),
    })
}

/// `/`-joined path of `dir` below `root`, or `.` for the root itself
pub(crate) fn relative_path(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Name collisions as `(winner, shadowed)` relative paths. Lookups resolve a
/// name to the first entry in scan order.
fn duplicate_names(snapshot: &[CatalogEntry]) -> Vec<(&str, &str)> {
    let mut first_seen: HashMap<String, &str> = HashMap::new();
    let mut duplicates = Vec::new();
    for entry in snapshot {
        let key = entry.name().to_lowercase();
        match first_seen.get(&key) {
            Some(first) => duplicates.push((*first, entry.relative_path.as_str())),
            None => {
                first_seen.insert(key, &entry.relative_path);
            }
        }
    }
    duplicates
}

fn warn_duplicate_names(snapshot: &[CatalogEntry]) {
    for (winner, shadowed) in duplicate_names(snapshot) {
        warn!(
            winner = %winner,
            shadowed = %shadowed,
            "Duplicate skill name; lookups resolve to the first bundle in scan order"
        );
    }
}

/// Runs scans for one root and installs the results into a store
#[derive(Clone)]
pub struct Scanner {
    root: PathBuf,
    store: CatalogStore,
}

impl Scanner {
    /// Create a scanner for `root` writing into `store`
    pub fn new(root: impl Into<PathBuf>, store: CatalogStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    /// Indexed root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root on a blocking thread and install the result.
    ///
    /// On error the previous snapshot is left in place. Returns the number of
    /// indexed skills.
    pub async fn rescan(&self) -> Result<usize> {
        let root = self.root.clone();
        let snapshot = tokio::task::spawn_blocking(move || scan_root(&root))
            .await
            .map_err(|e| CatalogError::io(&self.root, std::io::Error::other(e)))??;

        let count = snapshot.len();
        let generation = self.store.replace(snapshot).await;
        debug!(generation, count, "Installed catalog snapshot");
        Ok(count)
    }
}

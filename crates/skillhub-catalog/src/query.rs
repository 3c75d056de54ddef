//! Read-only queries over the live catalog
//!
//! Detail lookups re-read the descriptor from disk instead of caching it in
//! the snapshot, so the returned text may be newer than the entry's
//! `last_modified`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::entry::{CatalogEntry, EntryDetail, Snapshot};
use crate::error::{CatalogError, Result};
use crate::metadata::split_header;
use crate::scanner::walk_filtered;
use crate::store::CatalogStore;

/// Query service handle over a [`CatalogStore`]
#[derive(Clone)]
pub struct Catalog {
    store: CatalogStore,
}

impl Catalog {
    /// Create a query handle
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.store.read().await
    }

    /// Store generation, bumped on every completed scan
    pub async fn generation(&self) -> u64 {
        self.store.generation().await
    }

    /// Case-insensitive substring search over name and description.
    ///
    /// An empty query returns every entry. Results keep scan order.
    pub async fn search(&self, query: &str) -> Vec<CatalogEntry> {
        let snapshot = self.store.read().await;
        if query.is_empty() {
            return (*snapshot).clone();
        }

        let needle = query.to_lowercase();
        snapshot
            .iter()
            .filter(|entry| entry.matches(&needle))
            .cloned()
            .collect()
    }

    /// Look up a skill by name and assemble its detail view.
    ///
    /// Names match case-insensitively; with duplicates the first entry in
    /// scan order wins.
    pub async fn get_by_name(&self, name: &str) -> Result<EntryDetail> {
        let entry = self.find(name).await?;
        let descriptor = entry.descriptor_path.clone();

        tokio::task::spawn_blocking(move || assemble_detail(entry))
            .await
            .map_err(|e| CatalogError::io(descriptor, std::io::Error::other(e)))?
    }

    /// Absolute directory of the named skill
    pub async fn get_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.find(name).await?.absolute_path)
    }

    async fn find(&self, name: &str) -> Result<CatalogEntry> {
        let wanted = name.to_lowercase();
        self.store
            .read()
            .await
            .iter()
            .find(|entry| entry.name().to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }
}

fn assemble_detail(entry: CatalogEntry) -> Result<EntryDetail> {
    let bytes = std::fs::read(&entry.descriptor_path)
        .map_err(|e| CatalogError::io(&entry.descriptor_path, e))?;
    let readme = String::from_utf8_lossy(&bytes).into_owned();

    let body = match split_header(&readme, &entry.descriptor_path) {
        Ok((_, body)) => body.to_string(),
        Err(_) => readme.clone(),
    };
    let file_tree = render_tree(&entry.absolute_path);

    Ok(EntryDetail {
        entry,
        readme,
        body,
        file_tree,
    })
}

/// Render an indented listing of everything under `root`, skipping hidden and
/// noise directories. Directories end with `/`. Blocking.
pub fn render_tree(root: &Path) -> String {
    let mut tree = String::new();
    for entry in walk_filtered(root).filter_map(std::result::Result::ok) {
        if entry.depth() == 0 {
            continue;
        }
        let indent = "  ".repeat(entry.depth() - 1);
        let marker = if entry.file_type().is_dir() { "/" } else { "" };
        let _ = writeln!(
            tree,
            "{}- {}{}",
            indent,
            entry.file_name().to_string_lossy(),
            marker
        );
    }
    tree
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use std::fs;
    use tempfile::TempDir;

    async fn catalog_for(root: &Path) -> Catalog {
        let store = CatalogStore::new();
        Scanner::new(root, store.clone()).rescan().await.unwrap();
        Catalog::new(store)
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_search_filters_by_name_and_description() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/SKILL.md", "---\nname: pdf-tools\ndescription: Merge files\n---\n");
        write(tmp.path(), "b/SKILL.md", "---\nname: sheets\ndescription: Excel and PDF export\n---\n");
        write(tmp.path(), "c/SKILL.md", "---\nname: git\ndescription: Commits\n---\n");
        let catalog = catalog_for(tmp.path()).await;

        assert_eq!(catalog.search("").await.len(), 3);
        let names: Vec<_> = catalog
            .search("PDF")
            .await
            .into_iter()
            .map(|e| e.metadata.name)
            .collect();
        assert_eq!(names, vec!["pdf-tools", "sheets"]);
        assert!(catalog.search("nothing-like-this").await.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_name_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "foo/SKILL.md", "---\nname: foo\ndescription: d\n---\n# Foo\n");
        let catalog = catalog_for(tmp.path()).await;

        let detail = catalog.get_by_name("Foo").await.unwrap();
        assert_eq!(detail.entry.name(), "foo");
        assert_eq!(detail.body, "# Foo\n");
        assert!(detail.readme.starts_with("---\nname: foo"));
    }

    #[tokio::test]
    async fn test_get_by_name_reads_descriptor_fresh() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "foo/SKILL.md", "---\nname: foo\n---\nold body\n");
        let catalog = catalog_for(tmp.path()).await;

        write(tmp.path(), "foo/SKILL.md", "---\nname: foo\n---\nnew body\n");
        let detail = catalog.get_by_name("foo").await.unwrap();
        assert_eq!(detail.body, "new body\n");
    }

    #[tokio::test]
    async fn test_missing_name_is_not_found() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "foo/SKILL.md", "---\nname: foo\n---\n");
        let catalog = catalog_for(tmp.path()).await;

        assert!(matches!(
            catalog.get_by_name("gamma").await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.get_path("gamma").await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleted_descriptor_is_io_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "foo/SKILL.md", "---\nname: foo\n---\n");
        let catalog = catalog_for(tmp.path()).await;

        fs::remove_file(tmp.path().join("foo/SKILL.md")).unwrap();
        match catalog.get_by_name("foo").await {
            Err(CatalogError::Io { path, .. }) => {
                assert_eq!(path, tmp.path().join("foo/SKILL.md"));
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_resolve_to_first_in_scan_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/SKILL.md", "---\nname: dup\ndescription: first\n---\n");
        write(tmp.path(), "b/SKILL.md", "---\nname: DUP\ndescription: second\n---\n");
        let catalog = catalog_for(tmp.path()).await;

        let detail = catalog.get_by_name("dup").await.unwrap();
        assert_eq!(detail.entry.description(), "first");
        assert_eq!(catalog.get_path("Dup").await.unwrap(), tmp.path().join("a"));
    }

    #[test]
    fn test_render_tree() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "SKILL.md", "x");
        write(tmp.path(), "scripts/run.py", "x");
        write(tmp.path(), "scripts/__pycache__/run.pyc", "x");
        write(tmp.path(), ".git/HEAD", "x");
        write(tmp.path(), "docs/ref/api.md", "x");

        let tree = render_tree(tmp.path());
        assert_eq!(
            tree,
            "- SKILL.md\n- docs/\n  - ref/\n    - api.md\n- scripts/\n  - run.py\n"
        );
    }
}

//! `SkillHub` Catalog
//!
//! Indexing engine for a directory tree of skill bundles. A bundle is a
//! directory containing a `SKILL.md` file with a YAML header.
//!
//! ## Architecture
//!
//! - [`scanner`] walks the root and builds a complete snapshot per pass
//! - [`store`] holds the live snapshot; every scan replaces it wholesale
//! - [`watcher`] subscribes to filesystem changes and triggers debounced rescans
//! - [`query`] answers searches and detail lookups against the live snapshot
//! - [`indexer`] ties the pieces together for one root

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod debounce;
pub mod entry;
pub mod error;
pub mod indexer;
pub mod metadata;
pub mod query;
pub mod scanner;
pub mod store;
pub mod watcher;

pub use entry::{CatalogEntry, EntryDetail, Snapshot};
pub use error::{CatalogError, Result};
pub use indexer::{Indexer, DEFAULT_DEBOUNCE};
pub use metadata::SkillMetadata;
pub use query::Catalog;
pub use store::CatalogStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Catalog, CatalogEntry, CatalogError, EntryDetail, Indexer};
}

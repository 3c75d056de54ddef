//! Catalog entry types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::metadata::SkillMetadata;

/// One indexed skill bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Decoded descriptor header
    #[serde(flatten)]
    pub metadata: SkillMetadata,
    /// Absolute bundle directory, never exposed externally
    #[serde(skip)]
    pub absolute_path: PathBuf,
    /// Descriptor file the entry was parsed from
    #[serde(skip)]
    pub descriptor_path: PathBuf,
    /// Bundle directory relative to the indexed root, `/`-separated
    #[serde(rename = "path")]
    pub relative_path: String,
    /// Modification time of the descriptor at scan time
    #[serde(rename = "updated_at")]
    pub last_modified: DateTime<Utc>,
}

impl CatalogEntry {
    /// Skill name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Skill description
    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    /// Case-insensitive substring match on name and description.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.metadata.name.to_lowercase().contains(needle)
            || self.metadata.description.to_lowercase().contains(needle)
    }
}

/// A catalog entry with its descriptor text and file tree, assembled on demand
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetail {
    /// The entry as found in the catalog
    #[serde(flatten)]
    pub entry: CatalogEntry,
    /// Full descriptor text, read fresh from disk
    pub readme: String,
    /// Descriptor text after the header
    pub body: String,
    /// Indented listing of the bundle directory
    pub file_tree: String,
}

/// One complete generation of the catalog, in scan order
pub type Snapshot = Vec<CatalogEntry>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(name: &str, description: &str) -> CatalogEntry {
        CatalogEntry {
            metadata: SkillMetadata {
                name: name.to_string(),
                description: description.to_string(),
                ..SkillMetadata::default()
            },
            absolute_path: PathBuf::from("/srv/data/tools/pdf"),
            descriptor_path: PathBuf::from("/srv/data/tools/pdf/SKILL.md"),
            relative_path: "tools/pdf".to_string(),
            last_modified: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_serialized_shape_hides_absolute_path() {
        let json = serde_json::to_value(entry("pdf", "PDF tools")).unwrap();
        assert_eq!(json["name"], "pdf");
        assert_eq!(json["description"], "PDF tools");
        assert_eq!(json["path"], "tools/pdf");
        assert!(json.get("updated_at").is_some());
        assert!(json.get("tags").is_none());
        assert!(json.get("author").is_none());
        assert!(json.get("absolute_path").is_none());
        assert!(!json.to_string().contains("/srv/data"));
    }

    #[test]
    fn test_matches_name_or_description() {
        let e = entry("PDF-Toolkit", "Extract Tables");
        assert!(e.matches("pdf"));
        assert!(e.matches("tables"));
        assert!(!e.matches("excel"));
    }
}

//! Error types for catalog operations

use std::path::PathBuf;
use thiserror::Error;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Descriptor is missing the `---` header delimiters
    #[error("Invalid descriptor format in {}: {reason}", path.display())]
    Format {
        /// Descriptor file
        path: PathBuf,
        /// What was wrong with the delimiter structure
        reason: String,
    },

    /// Header block is present but could not be decoded
    #[error("Failed to decode header of {}: {source}", path.display())]
    Decode {
        /// Descriptor file
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// Disk read failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No catalog entry matches the requested name
    #[error("Skill '{name}' not found")]
    NotFound {
        /// Requested name
        name: String,
    },

    /// Change notifications could not be established
    #[error("Failed to watch {}: {reason}", path.display())]
    Watch {
        /// Directory being watched
        path: PathBuf,
        /// Failure reason
        reason: String,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the per-bundle parse failures that a scan skips over
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::Decode { .. })
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;

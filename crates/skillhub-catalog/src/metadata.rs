//! Descriptor parsing
//!
//! A descriptor (`SKILL.md`) starts with a `---` line, followed by a YAML
//! header, a second `---` line, and free-form markdown.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{CatalogError, Result};

/// A line consisting solely of `---`, optionally followed by spaces or `\r`
#[allow(clippy::expect_used)]
static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---[ \t]*\r?$").expect("delimiter pattern compiles"));

/// Skill metadata decoded from the descriptor header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillMetadata {
    /// Skill name, defaults to the bundle directory name when blank
    pub name: String,
    /// Free-text description (may be empty)
    pub description: String,
    /// Ordered tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Author, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Version, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Header as written on disk. Every field may be missing or `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHeader {
    name: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    author: Option<String>,
    version: Option<String>,
}

/// A descriptor split into decoded metadata and body text
#[derive(Debug, Clone)]
pub struct ParsedDescriptor {
    /// Decoded header
    pub metadata: SkillMetadata,
    /// Everything after the closing delimiter line
    pub body: String,
}

/// Split descriptor text into the raw header and the body.
///
/// The first line must be a delimiter; the header runs until the next line
/// consisting solely of `---`.
pub fn split_header<'a>(content: &'a str, descriptor: &Path) -> Result<(&'a str, &'a str)> {
    let format_error = |reason: &str| CatalogError::Format {
        path: descriptor.to_path_buf(),
        reason: reason.to_string(),
    };

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut delimiters = DELIMITER.find_iter(content);

    let open = delimiters
        .next()
        .ok_or_else(|| format_error("missing header delimiters"))?;
    if open.start() != 0 {
        return Err(format_error("descriptor must start with a '---' line"));
    }

    let close = delimiters
        .next()
        .ok_or_else(|| format_error("missing closing header delimiter"))?;

    let header = &content[open.end()..close.start()];
    let rest = &content[close.end()..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    Ok((header, body))
}

/// Parse a descriptor file's content.
///
/// `descriptor` is the path of the file the content was read from; its parent
/// directory name is used when the header has no `name`.
pub fn parse_descriptor(content: &str, descriptor: &Path) -> Result<ParsedDescriptor> {
    let (header, body) = split_header(content, descriptor)?;

    let raw: RawHeader = if header.trim().is_empty() {
        RawHeader::default()
    } else {
        serde_yaml::from_str::<Option<RawHeader>>(header)
            .map_err(|source| CatalogError::Decode {
                path: descriptor.to_path_buf(),
                source,
            })?
            .unwrap_or_default()
    };

    let name = match raw.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => bundle_dir_name(descriptor),
    };

    Ok(ParsedDescriptor {
        metadata: SkillMetadata {
            name,
            description: raw.description.unwrap_or_default(),
            tags: raw.tags.unwrap_or_default(),
            author: raw.author.filter(|a| !a.is_empty()),
            version: raw.version.filter(|v| !v.is_empty()),
        },
        body: body.to_string(),
    })
}

fn bundle_dir_name(descriptor: &Path) -> String {
    descriptor
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

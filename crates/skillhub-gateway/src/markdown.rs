//! Plain markdown views for LLM clients

use skillhub_catalog::{CatalogEntry, EntryDetail};

/// Registry overview listing every skill
pub fn guide(skills: &[CatalogEntry]) -> String {
    let mut md = String::from(
        "# Skills Registry\n\n\
         Welcome to the Skills Registry.\n\n\
         ## Usage\n\
         Fetch `/skill/<name>.md` for a skill's full documentation, or download \
         the whole bundle from `/api/v1/download/<name>`.\n\n\
         ## Available Skills\n",
    );

    if skills.is_empty() {
        md.push_str("No skills available\n");
    }
    for skill in skills {
        md.push_str(&format!("- **{}**: {}\n", skill.name(), skill.description()));
    }

    md
}

/// Full document for one skill
pub fn skill_document(detail: &EntryDetail) -> String {
    let meta = &detail.entry.metadata;
    format!(
        "# {}\n\n> {}\n\n## Metadata\n- Version: {}\n- Author: {}\n\n## File Structure\n```\n{}\n```\n\n## Documentation\n\n{}",
        meta.name,
        meta.description,
        meta.version.as_deref().unwrap_or("-"),
        meta.author.as_deref().unwrap_or("-"),
        detail.file_tree,
        detail.readme
    )
}

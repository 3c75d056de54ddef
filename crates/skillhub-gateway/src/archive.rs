//! Bundle download archives

use anyhow::{bail, Context, Result};
use flate2::{write::GzEncoder, Compression};
use skillhub_catalog::scanner::is_skipped_dir_name;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Build a gzipped tarball of `dir`. Entries are prefixed with the directory's
/// own name; hidden and noise directories and symlinks are left out.
pub fn bundle_tarball(dir: &Path) -> Result<Vec<u8>> {
    let base = dir
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("skill"));

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    builder.follow_symlinks(false);

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !(e.file_type().is_dir() && is_skipped_dir_name(e.file_name()))
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.depth() == 0 {
            continue;
        }

        let rel = entry.path().strip_prefix(dir)?;
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            bail!("Refusing to archive path outside bundle: {}", rel.display());
        }
        let name = base.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else if file_type.is_file() {
            builder
                .append_path_with_name(entry.path(), &name)
                .with_context(|| format!("Failed to archive {}", entry.path().display()))?;
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular file in archive");
        }
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Download file name for a bundle directory
pub fn archive_file_name(dir: &Path) -> String {
    let stem: String = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let stem = stem.trim_matches('.');

    if stem.is_empty() {
        "skill.tar.gz".to_string()
    } else {
        format!("{}.tar.gz", stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use tempfile::TempDir;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path().unwrap().to_string_lossy().into_owned();
                path.trim_end_matches('/').to_string()
            })
            .collect()
    }

    #[test]
    fn test_tarball_contents() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("pdf");
        fs::create_dir_all(bundle.join("scripts/__pycache__")).unwrap();
        fs::create_dir_all(bundle.join(".git")).unwrap();
        fs::write(bundle.join("SKILL.md"), "---\nname: pdf\n---\n").unwrap();
        fs::write(bundle.join("scripts/run.py"), "print()").unwrap();
        fs::write(bundle.join("scripts/__pycache__/run.pyc"), "x").unwrap();
        fs::write(bundle.join(".git/HEAD"), "x").unwrap();

        let names = entry_names(&bundle_tarball(&bundle).unwrap());
        assert_eq!(
            names,
            vec!["pdf/SKILL.md", "pdf/scripts", "pdf/scripts/run.py"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("pdf");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(tmp.path().join("secret.txt"), "secret").unwrap();
        fs::write(bundle.join("SKILL.md"), "---\n---\n").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("secret.txt"), bundle.join("leak.txt")).unwrap();

        let names = entry_names(&bundle_tarball(&bundle).unwrap());
        assert_eq!(names, vec!["pdf/SKILL.md"]);
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name(Path::new("/data/pdf-tools")), "pdf-tools.tar.gz");
        assert_eq!(archive_file_name(Path::new("/data/we\"ird")), "weird.tar.gz");
        assert_eq!(archive_file_name(Path::new("/")), "skill.tar.gz");
    }
}

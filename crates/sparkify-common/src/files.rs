//! Input file discovery

use crate::error::{CommonError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Recursively collect every file below `root` whose extension matches
/// `extension` (case-insensitive, without the leading dot).
///
/// Paths are returned absolute and sorted so that runs over the same tree
/// always visit files in the same order.
pub fn discover_files(root: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CommonError::DirectoryNotFound(root.to_path_buf()));
    }

    let root = std::fs::canonicalize(root)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "Discovered input files");

    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_files_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("A").join("B");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("TRAAAAW128F429D538.json"), "{}").unwrap();
        std::fs::write(dir.path().join("2018-11-01-events.JSON"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = discover_files(dir.path(), "json").unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_discover_files_missing_root() {
        let result = discover_files("/definitely/not/here", "json");
        assert!(matches!(result, Err(CommonError::DirectoryNotFound(_))));
    }
}

//! Removal of directories left empty after sorting.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Returns true if `dir` contains no entries other than hidden ones.
pub fn has_only_hidden_entries(dir: &Path) -> std::io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !is_hidden_name(&entry.file_name().to_string_lossy()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Deletes every directory under `root` that holds no non-hidden entries.
///
/// Directories are visited children first, so a parent that only contained
/// empty subdirectories is removed in the same pass. The root itself is never
/// removed. Deletion is best-effort: failures are logged and skipped.
///
/// Returns the directories that were removed.
pub fn prune_empty_directories(root: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    let dirs = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for entry in dirs {
        let path = entry.path();
        match has_only_hidden_entries(path) {
            Ok(true) => match fs::remove_dir_all(path) {
                Ok(()) => {
                    info!(path = %path.display(), "empty directory deleted");
                    removed.push(path.to_path_buf());
                }
                Err(e) => debug!(path = %path.display(), error = %e, "could not delete directory"),
            },
            Ok(false) => {}
            Err(e) => debug!(path = %path.display(), error = %e, "could not list directory"),
        }
    }

    removed
}

//! Source and destination tree enumeration.
//!
//! Produces a flat, sorted list of regular files under a root:
//! - a root that is a file yields itself
//! - directory entries are visited in file name order, depth first
//! - generation directories (`.copyMinus<n>`) are pruned
//! - symlinks are neither followed nor reported

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{BackupError, Result};
use crate::rotate::is_generation_dir;

pub fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    if !root.is_dir() {
        return Err(BackupError::PathNotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_history(e));

    let mut files = Vec::new();

    for entry in walker {
        // an unreadable subtree must not look like a deleted one
        let entry = entry.map_err(|e| BackupError::Scan {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e,
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), files = files.len(), "scan complete");
    Ok(files)
}

// the root itself is never pruned, even if it happens to carry a generation name
fn is_history(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && is_generation_dir(entry.file_name())
}

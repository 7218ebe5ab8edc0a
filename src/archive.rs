//! Post-job archiving through an external 7z-compatible tool.
//!
//! Runs `<archiver> a -t7z <dest_root>.7z <dest_root>` once a job has
//! finished cleanly. The engine never calls this.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{BackupError, Result};

pub const DEFAULT_ARCHIVER: &str = "7z";

/// `/backup/docs` archives to `/backup/docs.7z`, beside the tree it packs.
pub fn archive_path(dest_root: &Path) -> PathBuf {
    let mut name: OsString = dest_root.as_os_str().to_owned();
    name.push(".7z");
    PathBuf::from(name)
}

pub fn archive_destination(archiver: &str, dest_root: &Path) -> Result<PathBuf> {
    let target = archive_path(dest_root);

    let output = Command::new(archiver)
        .arg("a")
        .arg("-t7z")
        .arg(&target)
        .arg(dest_root)
        .output();

    match output {
        Ok(result) if result.status.success() => {
            tracing::info!(archive = %target.display(), "archived destination");
            Ok(target)
        }
        Ok(result) => {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(BackupError::Archive(format!(
                "{archiver} failed for {}: {}",
                dest_root.display(),
                stderr.trim()
            )))
        }
        Err(e) => Err(BackupError::Archive(format!("failed to run {archiver}: {e}"))),
    }
}

//! Generation rotation for destination files.
//!
//! Generation 0 is the live copy at `dest_root/<rel>`. Generation `g` for
//! `g` in `1..=retention` lives at `dest_root/.copyMinus<g>/<rel>`. Before
//! the live copy is overwritten or retired every generation moves one slot
//! outward, deepest first, and whatever sat in the last slot is evicted.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{BackupError, Result};

pub const GENERATION_PREFIX: &str = ".copyMinus";

pub fn generation_dir(dest_root: &Path, generation: u32) -> PathBuf {
    dest_root.join(format!("{GENERATION_PREFIX}{generation}"))
}

/// True for directory names of the form `.copyMinus<digits>`.
pub fn is_generation_dir(name: &OsStr) -> bool {
    name.to_str()
        .and_then(|s| s.strip_prefix(GENERATION_PREFIX))
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

pub struct VersionRotator<'a> {
    dest_root: &'a Path,
    retention: u32,
}

impl<'a> VersionRotator<'a> {
    pub fn new(dest_root: &'a Path, retention: u32) -> Self {
        VersionRotator { dest_root, retention }
    }

    pub fn generation_path(&self, relative: &Path, generation: u32) -> PathBuf {
        if generation == 0 {
            self.dest_root.join(relative)
        } else {
            generation_dir(self.dest_root, generation).join(relative)
        }
    }

    /// Pushes the current live copy into history and puts `source` in its
    /// place. Returns the number of bytes copied.
    pub fn replace(&self, source: &Path, relative: &Path) -> Result<u64> {
        self.shift(relative)?;
        copy_preserving_mtime(source, &self.generation_path(relative, 0))
    }

    /// Pushes the live copy into history without a replacement. With no
    /// retention the live copy is simply removed.
    pub fn retire(&self, relative: &Path) -> Result<()> {
        if self.retention == 0 {
            let live = self.generation_path(relative, 0);
            return match fs::remove_file(&live) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(BackupError::io(live, e)),
            };
        }

        self.shift(relative)
    }

    fn shift(&self, relative: &Path) -> Result<()> {
        // nothing enters history without a live copy
        if !self.generation_path(relative, 0).is_file() {
            return Ok(());
        }

        for generation in (1..=self.retention).rev() {
            let from = self.generation_path(relative, generation - 1);
            if !from.is_file() {
                continue;
            }

            let to = self.generation_path(relative, generation);
            move_evicting(&from, &to)?;
            tracing::trace!(from = %from.display(), to = %to.display(), "shifted generation");
        }

        Ok(())
    }
}

fn move_evicting(from: &Path, to: &Path) -> Result<()> {
    create_parent(from, to)?;

    if to.is_file() {
        fs::remove_file(to).map_err(|e| BackupError::copy(from, to, e))?;
    }

    fs::rename(from, to).map_err(|e| BackupError::copy(from, to, e))
}

fn create_parent(from: &Path, to: &Path) -> Result<()> {
    match to.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| BackupError::copy(from, to, e)),
        None => Ok(()),
    }
}

/// Copies `from` to `to`, creating parent directories, and stamps the copy
/// with the source's modification time.
pub fn copy_preserving_mtime(from: &Path, to: &Path) -> Result<u64> {
    create_parent(from, to)?;

    let bytes = fs::copy(from, to).map_err(|e| BackupError::copy(from, to, e))?;

    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .map_err(|e| BackupError::io(from, e))?;

    File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| BackupError::copy(from, to, e))?;

    Ok(bytes)
}

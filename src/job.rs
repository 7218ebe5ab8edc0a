//! Backup job descriptor and the source-to-destination path mapping.

use std::path::{Component, Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{BackupError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComparatorKind {
    /// Source modification time strictly newer than the backed up copy
    #[default]
    #[serde(alias = "bydate")]
    #[value(alias = "bydate")]
    Time,
    /// MD5 digest of the source differs from the backed up copy
    #[serde(alias = "byhash")]
    #[value(alias = "byhash")]
    Hash,
}

impl ComparatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparatorKind::Time => "time",
            ComparatorKind::Hash => "hash",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Keep a catalogue of backed up files between runs
    #[default]
    #[serde(alias = "database")]
    #[value(alias = "database")]
    Persistent,
    /// Compare against the destination tree directly
    #[serde(alias = "simple")]
    #[value(alias = "simple")]
    Stateless,
}

impl CatalogMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogMode::Persistent => "persistent",
            CatalogMode::Stateless => "stateless",
        }
    }
}

/// One source tree mirrored into one destination tree.
///
/// A job is built once and then only ever borrowed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    pub name: String,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub comparator: ComparatorKind,
    /// Number of historical generations kept beside the live copy
    pub retention: u32,
    pub catalog_mode: CatalogMode,
}

impl BackupJob {
    pub fn new(name: impl Into<String>, source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        BackupJob {
            name: name.into(),
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            comparator: ComparatorKind::Time,
            retention: 0,
            catalog_mode: CatalogMode::Persistent,
        }
    }

    pub fn with_comparator(mut self, comparator: ComparatorKind) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_retention(mut self, retention: u32) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_catalog_mode(mut self, catalog_mode: CatalogMode) -> Self {
        self.catalog_mode = catalog_mode;
        self
    }

    /// Rejects jobs whose roots would make the path mapping ambiguous.
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() || self.dest_root.as_os_str().is_empty() {
            return Err(BackupError::Config(format!(
                "job '{}' needs both a source and a destination",
                self.name
            )));
        }

        if !self.source_root.is_absolute() || !self.dest_root.is_absolute() {
            return Err(BackupError::Config(format!(
                "job '{}' roots must be absolute paths",
                self.name
            )));
        }

        if has_parent_components(&self.source_root) || has_parent_components(&self.dest_root) {
            return Err(BackupError::Config(format!(
                "job '{}' roots must not contain '..'",
                self.name
            )));
        }

        // a destination inside the source would be scanned as live content
        if self.dest_root.starts_with(&self.source_root) || self.source_root.starts_with(&self.dest_root) {
            return Err(BackupError::Config(format!(
                "job '{}': source {} and destination {} overlap",
                self.name,
                self.source_root.display(),
                self.dest_root.display()
            )));
        }

        Ok(())
    }

    /// Path of `source` relative to the source root. A job whose root is a
    /// single file maps that file to its own name.
    pub fn relative_path(&self, source: &Path) -> Result<PathBuf> {
        if source == self.source_root {
            return self
                .source_root
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| outside_root(source, &self.source_root));
        }

        source
            .strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .map_err(|_| outside_root(source, &self.source_root))
    }

    pub fn dest_path_for(&self, source: &Path) -> Result<PathBuf> {
        Ok(self.dest_root.join(self.relative_path(source)?))
    }

    /// Inverse of [`BackupJob::dest_path_for`].
    pub fn source_path_for(&self, dest: &Path) -> Result<PathBuf> {
        let relative = dest
            .strip_prefix(&self.dest_root)
            .map_err(|_| outside_root(dest, &self.dest_root))?;

        if self.source_root.is_file() && self.source_root.file_name() == Some(relative.as_os_str()) {
            return Ok(self.source_root.clone());
        }

        Ok(self.source_root.join(relative))
    }
}

fn has_parent_components(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn outside_root(path: &Path, root: &Path) -> BackupError {
    BackupError::Config(format!(
        "{} is not under {}",
        path.display(),
        root.display()
    ))
}

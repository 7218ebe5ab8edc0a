//! Catalogue of backed up files.
//!
//! A catalogue answers "what did the last run leave behind?" for one job:
//! - `SqliteCatalog`: durable records in a local SQLite database
//! - `MemoryCatalog`: the same contract held in a map, for one process
//! - `DestinationCatalog`: no stored state, records derived from the destination tree
//!
//! Records are keyed by (source path, destination path).

pub mod destination;
pub mod sqlite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::compare::hash::hash_file;
use crate::error::{BackupError, Result};
use crate::job::{BackupJob, CatalogMode, ComparatorKind};

pub use destination::DestinationCatalog;
pub use sqlite::SqliteCatalog;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

impl RecordKey {
    pub fn new(source_path: impl Into<PathBuf>, dest_path: impl Into<PathBuf>) -> Self {
        RecordKey {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
        }
    }
}

/// Last known backed up state of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub file_name: String,
    /// Source modification time at the last copy, nanoseconds since the Unix epoch
    pub modified_ns: i64,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_digest")]
    pub content_hash: Option<Vec<u8>>,
}

impl FileRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.source_path, &self.dest_path)
    }

    /// Records the current state of `source`. Only jobs that compare by
    /// hash store a digest; `known_digest` is used when the caller already
    /// hashed the source, otherwise the file is hashed here.
    pub fn capture(
        source: &Path,
        dest: &Path,
        comparator: ComparatorKind,
        known_digest: Option<Vec<u8>>,
    ) -> Result<Self> {
        let content_hash = match (comparator, known_digest) {
            (ComparatorKind::Hash, Some(digest)) => Some(digest),
            (ComparatorKind::Hash, None) => Some(hash_file(source)?),
            (ComparatorKind::Time, _) => None,
        };

        Ok(FileRecord {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            file_name: file_name_of(source),
            modified_ns: modified_ns(source)?,
            content_hash,
        })
    }

    /// Synthesizes a record from the destination copy's own metadata.
    pub fn from_destination(source: &Path, dest: &Path) -> Result<Self> {
        Ok(FileRecord {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            file_name: file_name_of(dest),
            modified_ns: modified_ns(dest)?,
            content_hash: None,
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn serialize_digest<S: serde::Serializer>(digest: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match digest {
        Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

pub fn unix_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map(|n| -n).unwrap_or(i64::MIN),
    }
}

pub fn modified_time(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| BackupError::io(path, e))
}

pub fn modified_ns(path: &Path) -> Result<i64> {
    modified_time(path).map(unix_nanos)
}

pub trait CatalogStore {
    fn find(&self, key: &RecordKey) -> Result<Option<FileRecord>>;

    fn upsert(&mut self, record: FileRecord) -> Result<()>;

    fn remove(&mut self, key: &RecordKey) -> Result<()>;

    /// Every record whose source path lies under `source_root`, sorted by key.
    fn records_under_root(&self, source_root: &Path) -> Result<Vec<FileRecord>>;

    /// Makes this job's changes durable. Called once, at the end of a job.
    fn commit(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: BTreeMap<RecordKey, FileRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CatalogStore for MemoryCatalog {
    fn find(&self, key: &RecordKey) -> Result<Option<FileRecord>> {
        Ok(self.records.get(key).cloned())
    }

    fn upsert(&mut self, record: FileRecord) -> Result<()> {
        self.records.insert(record.key(), record);
        Ok(())
    }

    fn remove(&mut self, key: &RecordKey) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }

    fn records_under_root(&self, source_root: &Path) -> Result<Vec<FileRecord>> {
        Ok(self
            .records
            .values()
            .filter(|r| r.source_path.starts_with(source_root))
            .cloned()
            .collect())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens the catalogue a job's mode calls for.
pub fn open_catalog(job: &BackupJob, catalog_path: &Path) -> Result<Box<dyn CatalogStore>> {
    match job.catalog_mode {
        CatalogMode::Persistent => Ok(Box::new(SqliteCatalog::open(catalog_path)?)),
        CatalogMode::Stateless => Ok(Box::new(DestinationCatalog::new(job.clone()))),
    }
}

//! Stateless catalogue backed by the destination tree itself.

use std::path::Path;

use super::{CatalogStore, FileRecord, RecordKey};
use crate::error::Result;
use crate::job::BackupJob;
use crate::scan;

/// Derives "previously known" files from what the destination holds.
/// Writes are accepted and dropped: the destination tree is the state.
pub struct DestinationCatalog {
    job: BackupJob,
}

impl DestinationCatalog {
    pub fn new(job: BackupJob) -> Self {
        DestinationCatalog { job }
    }
}

impl CatalogStore for DestinationCatalog {
    fn find(&self, key: &RecordKey) -> Result<Option<FileRecord>> {
        if !key.dest_path.is_file() {
            return Ok(None);
        }
        FileRecord::from_destination(&key.source_path, &key.dest_path).map(Some)
    }

    fn upsert(&mut self, _record: FileRecord) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self, _key: &RecordKey) -> Result<()> {
        Ok(())
    }

    fn records_under_root(&self, source_root: &Path) -> Result<Vec<FileRecord>> {
        if source_root != self.job.source_root || !self.job.dest_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for dest in scan::scan(&self.job.dest_root)? {
            let source = self.job.source_path_for(&dest)?;
            records.push(FileRecord::from_destination(&source, &dest)?);
        }

        Ok(records)
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

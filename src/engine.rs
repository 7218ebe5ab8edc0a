//! Runs one backup job.
//!
//! A job is applied in a fixed order:
//! - resolve what the previous run left (catalogue records or a destination scan)
//! - scan the whole source tree before touching anything
//! - copy new files, rotate and replace changed ones, leave unchanged ones
//! - retire destination files whose source disappeared
//! - commit the catalogue once
//!
//! The first integrity or I/O failure ends the job. Work already applied
//! stays applied, is counted in the result, and its catalogue updates are
//! still committed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Serialize, Serializer};

use crate::catalog::{CatalogStore, FileRecord, RecordKey};
use crate::compare::Comparator;
use crate::error::{BackupError, Result};
use crate::job::{BackupJob, CatalogMode};
use crate::rotate::VersionRotator;
use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    New,
    Unchanged,
    Changed,
}

#[derive(Debug, Serialize)]
pub struct JobResult {
    pub job: String,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub bytes_copied: u64,
    pub duration_ms: u128,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<BackupError>,
}

impl JobResult {
    fn empty(job: &BackupJob) -> Self {
        JobResult {
            job: job.name.clone(),
            source_root: job.source_root.clone(),
            dest_root: job.dest_root.clone(),
            added: 0,
            updated: 0,
            unchanged: 0,
            deleted: 0,
            bytes_copied: 0,
            duration_ms: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Files added, updated or deleted by this run.
    pub fn changes(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

fn serialize_errors<S: Serializer>(errors: &[BackupError], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

pub fn run_job(job: &BackupJob, catalog: &mut dyn CatalogStore) -> JobResult {
    let start = Instant::now();
    let mut result = JobResult::empty(job);

    tracing::info!(
        job = %job.name,
        source = %job.source_root.display(),
        dest = %job.dest_root.display(),
        compare = job.comparator.as_str(),
        mode = job.catalog_mode.as_str(),
        retention = job.retention,
        "starting job"
    );

    let outcome = apply(job, catalog, &mut result);

    if let Err(e) = outcome {
        tracing::warn!(job = %job.name, error = %e, "job aborted");
        result.errors.push(e);
    }

    // an aborted job still publishes the records of what it applied
    if let Err(e) = catalog.commit() {
        tracing::warn!(job = %job.name, error = %e, "catalogue commit failed");
        result.errors.push(e);
    }

    result.duration_ms = start.elapsed().as_millis();

    tracing::info!(
        job = %job.name,
        added = result.added,
        updated = result.updated,
        unchanged = result.unchanged,
        deleted = result.deleted,
        errors = result.errors.len(),
        "job finished"
    );

    result
}

fn apply(job: &BackupJob, catalog: &mut dyn CatalogStore, result: &mut JobResult) -> Result<()> {
    job.validate()?;

    let comparator = Comparator::from(job.comparator);
    let rotator = VersionRotator::new(&job.dest_root, job.retention);

    let known: Vec<FileRecord> = catalog
        .records_under_root(&job.source_root)?
        .into_iter()
        .filter(|r| r.dest_path.starts_with(&job.dest_root))
        .collect();

    // deletion detection needs the complete candidate set up front
    let candidates = scan::scan(&job.source_root)?;
    let mut observed: HashSet<PathBuf> = HashSet::with_capacity(candidates.len());

    for source in &candidates {
        let relative = job.relative_path(source)?;
        let dest = job.dest_root.join(&relative);
        observed.insert(dest.clone());

        let key = RecordKey::new(source, &dest);
        let prior = catalog.find(&key)?;

        let decision = classify(job, comparator, source, &dest, prior.as_ref())?;

        match decision.class {
            Classification::New => {
                let bytes = rotator.replace(source, &relative)?;
                catalog.upsert(FileRecord::capture(source, &dest, job.comparator, decision.source_digest)?)?;
                result.added += 1;
                result.bytes_copied += bytes;
                tracing::debug!(file = %relative.display(), "added");
            }
            Classification::Changed => {
                let bytes = rotator.replace(source, &relative)?;
                catalog.upsert(FileRecord::capture(source, &dest, job.comparator, decision.source_digest)?)?;
                result.updated += 1;
                result.bytes_copied += bytes;
                tracing::debug!(file = %relative.display(), "updated");
            }
            Classification::Unchanged => {
                result.unchanged += 1;
                tracing::trace!(file = %relative.display(), "unchanged");
            }
        }
    }

    for record in known.iter().filter(|r| !observed.contains(&r.dest_path)) {
        retire(job, &rotator, catalog, record)?;
        result.deleted += 1;
    }

    Ok(())
}

/// What a candidate needs, plus the source digest when deciding it
/// required one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub class: Classification,
    pub source_digest: Option<Vec<u8>>,
}

/// Decides what a candidate needs. A candidate with no prior state is NEW
/// without consulting the comparator.
pub fn classify(
    job: &BackupJob,
    comparator: Comparator,
    source: &Path,
    dest: &Path,
    prior: Option<&FileRecord>,
) -> Result<Decision> {
    let Some(record) = prior else {
        return Ok(Decision {
            class: Classification::New,
            source_digest: None,
        });
    };

    let comparison = match job.catalog_mode {
        CatalogMode::Persistent => {
            ensure_backed_up(record)?;
            comparator.by_record(source, record)?
        }
        CatalogMode::Stateless => comparator.by_paths(source, dest)?,
    };

    let class = if comparison.changed {
        Classification::Changed
    } else {
        Classification::Unchanged
    };

    Ok(Decision {
        class,
        source_digest: comparison.source_digest,
    })
}

fn retire(job: &BackupJob, rotator: &VersionRotator, catalog: &mut dyn CatalogStore, record: &FileRecord) -> Result<()> {
    if job.catalog_mode == CatalogMode::Persistent {
        ensure_backed_up(record)?;
    }

    let relative = record
        .dest_path
        .strip_prefix(&job.dest_root)
        .map_err(|_| BackupError::Config(format!(
            "{} is not under {}",
            record.dest_path.display(),
            job.dest_root.display()
        )))?;

    rotator.retire(relative)?;
    catalog.remove(&record.key())?;
    tracing::debug!(file = %relative.display(), "deleted");

    Ok(())
}

fn ensure_backed_up(record: &FileRecord) -> Result<()> {
    if record.dest_path.is_file() {
        Ok(())
    } else {
        Err(BackupError::Integrity {
            source_path: record.source_path.clone(),
            dest_path: record.dest_path.clone(),
        })
    }
}

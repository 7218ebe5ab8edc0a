//! Change detection strategies.
//!
//! Each strategy answers "does this source file need copying again?" either
//! against the destination copy on disk or against a catalogue record.

pub mod hash;

use std::path::Path;

use crate::catalog::{modified_ns, modified_time, FileRecord};
use crate::error::Result;
use crate::job::ComparatorKind;
use hash::{digests_match, hash_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Time,
    Hash,
}

impl From<ComparatorKind> for Comparator {
    fn from(kind: ComparatorKind) -> Self {
        match kind {
            ComparatorKind::Time => Comparator::Time,
            ComparatorKind::Hash => Comparator::Hash,
        }
    }
}

/// Result of one comparison. A source digest computed along the way is
/// handed back so the refreshed record does not read the file again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub changed: bool,
    pub source_digest: Option<Vec<u8>>,
}

impl Comparison {
    fn without_digest(changed: bool) -> Self {
        Comparison {
            changed,
            source_digest: None,
        }
    }

    fn by_digest(source_digest: Vec<u8>, other: &[u8]) -> Self {
        Comparison {
            changed: !digests_match(&source_digest, other),
            source_digest: Some(source_digest),
        }
    }
}

impl Comparator {
    pub fn by_paths(&self, source: &Path, dest: &Path) -> Result<Comparison> {
        match self {
            Comparator::Time => Ok(Comparison::without_digest(modified_time(source)? > modified_time(dest)?)),
            Comparator::Hash => Ok(Comparison::by_digest(hash_file(source)?, &hash_file(dest)?)),
        }
    }

    /// A hash comparison against a record with no stored digest always
    /// reports a change.
    pub fn by_record(&self, source: &Path, record: &FileRecord) -> Result<Comparison> {
        match self {
            Comparator::Time => Ok(Comparison::without_digest(modified_ns(source)? > record.modified_ns)),
            Comparator::Hash => match &record.content_hash {
                Some(recorded) => Ok(Comparison::by_digest(hash_file(source)?, recorded)),
                None => Ok(Comparison::without_digest(true)),
            },
        }
    }
}

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod logging;
pub mod report;
pub mod rotate;
pub mod scan;
pub mod util;

pub use catalog::{CatalogStore, FileRecord, RecordKey};
pub use engine::{run_job, JobResult};
pub use error::{BackupError, Result};
pub use job::{BackupJob, CatalogMode, ComparatorKind};

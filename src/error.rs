use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("catalogue lists {} as backed up to {}, but the destination file is missing", .source_path.display(), .dest_path.display())]
    Integrity {
        source_path: PathBuf,
        dest_path: PathBuf,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("catalogue error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("archiving failed: {0}")]
    Archive(String),
}

impl BackupError {
    pub(crate) fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Copy {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

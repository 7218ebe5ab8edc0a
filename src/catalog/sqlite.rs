//! SQLite file catalogue.
//!
//! One table, `files`, keyed by (source_path, destination_path). Paths are
//! stored as their raw bytes so names that are not UTF-8 survive a round
//! trip. A catalogue handle holds an exclusive transaction from `open` until
//! `commit`, so a job sees no outside writes and publishes its changes once.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use rusqlite::{params, Connection, OptionalExtension};

use super::{CatalogStore, FileRecord, RecordKey};
use crate::error::{BackupError, Result};

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            source_path BLOB NOT NULL,
            dest_path BLOB NOT NULL,
            file_name TEXT NOT NULL,
            modified_ns INTEGER NOT NULL,
            content_hash BLOB,
            PRIMARY KEY (source_path, dest_path)
        )",
        [],
    )?;

    Ok(())
}

/// Catalogue handle. Open once per job.
pub struct SqliteCatalog {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BackupError::io(parent, e))?;
        }

        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        conn.execute_batch("BEGIN EXCLUSIVE;")?;
        Ok(SqliteCatalog {
            conn,
            in_transaction: true,
        })
    }

    /// All records in the catalogue, across every job.
    pub fn all_records(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_path, dest_path, file_name, modified_ns, content_hash
             FROM files
             ORDER BY source_path, dest_path",
        )?;

        let records = stmt.query_map([], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    // the transaction is reopened so the handle stays usable after a commit
    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN EXCLUSIVE;")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl CatalogStore for SqliteCatalog {
    fn find(&self, key: &RecordKey) -> Result<Option<FileRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT source_path, dest_path, file_name, modified_ns, content_hash
                 FROM files
                 WHERE source_path = ?1 AND dest_path = ?2",
                params![path_bytes(&key.source_path), path_bytes(&key.dest_path)],
                record_from_row,
            )
            .optional()?;

        Ok(record)
    }

    fn upsert(&mut self, record: FileRecord) -> Result<()> {
        self.begin_if_needed()?;

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO files (source_path, dest_path, file_name, modified_ns, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (source_path, dest_path) DO UPDATE SET
                file_name = excluded.file_name,
                modified_ns = excluded.modified_ns,
                content_hash = excluded.content_hash",
        )?;

        stmt.execute(params![
            path_bytes(&record.source_path),
            path_bytes(&record.dest_path),
            record.file_name,
            record.modified_ns,
            record.content_hash,
        ])?;

        Ok(())
    }

    fn remove(&mut self, key: &RecordKey) -> Result<()> {
        self.begin_if_needed()?;

        self.conn.execute(
            "DELETE FROM files WHERE source_path = ?1 AND dest_path = ?2",
            params![path_bytes(&key.source_path), path_bytes(&key.dest_path)],
        )?;

        Ok(())
    }

    fn records_under_root(&self, source_root: &Path) -> Result<Vec<FileRecord>> {
        let separator = MAIN_SEPARATOR.to_string();
        let root = path_bytes(source_root);
        let mut prefix = root.clone();
        if !prefix.ends_with(separator.as_bytes()) {
            prefix.extend_from_slice(separator.as_bytes());
        }

        // substr on blobs compares raw bytes, so the match is exact and case sensitive
        let mut stmt = self.conn.prepare(
            "SELECT source_path, dest_path, file_name, modified_ns, content_hash
             FROM files
             WHERE source_path = ?1 OR substr(source_path, 1, length(?2)) = ?2
             ORDER BY source_path, dest_path",
        )?;

        let records = stmt.query_map(params![root, prefix], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT;")?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

// windows paths that are not valid unicode cannot be stored exactly
#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        source_path: path_from_bytes(row.get(0)?),
        dest_path: path_from_bytes(row.get(1)?),
        file_name: row.get(2)?,
        modified_ns: row.get(3)?,
        content_hash: row.get(4)?,
    })
}

//! SQLite storage implementation

use std::io::Write;
use std::path::{Path, PathBuf};
use rusqlite::{Connection, DatabaseName, ErrorCode, params};
use tempfile::NamedTempFile;
use crate::{Result, Error};
use crate::record::Record;
use super::schema;

/// Handle on the embedded SQL engine.
///
/// Created once at startup and handed to whoever needs databases. The scratch
/// directory is where snapshot images are staged while moving between the
/// engine and raw bytes.
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    scratch_dir: PathBuf,
}

impl SqliteEngine {
    /// Bring up the engine, creating the scratch directory if needed
    pub fn start(scratch_dir: impl Into<PathBuf>) -> Result<Self> {
        let engine = Self { scratch_dir: scratch_dir.into() };
        std::fs::create_dir_all(&engine.scratch_dir).map_err(|e| {
            Error::EngineUnavailable(format!(
                "cannot create scratch directory {}: {}",
                engine.scratch_dir.display(),
                e
            ))
        })?;
        let version = engine.check()?;
        tracing::debug!("SQLite {} ready (scratch: {})", version, engine.scratch_dir.display());
        Ok(engine)
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Verify the engine is still usable; returns the SQLite library version
    pub fn check(&self) -> Result<String> {
        if !self.scratch_dir.is_dir() {
            return Err(Error::EngineUnavailable(format!(
                "scratch directory {} is missing",
                self.scratch_dir.display()
            )));
        }

        let conn = Connection::open_in_memory()
            .map_err(|e| Error::EngineUnavailable(e.to_string()))?;
        conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| Error::EngineUnavailable(e.to_string()))
    }

    /// Open a live in-memory database, optionally restored from a snapshot image
    pub fn open(&self, snapshot: Option<&[u8]>) -> Result<Database> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| Error::EngineUnavailable(e.to_string()))?;

        if let Some(bytes) = snapshot {
            let mut staged = stage_in(&self.scratch_dir)?;
            staged.write_all(bytes)?;
            staged.flush()?;

            conn.restore(DatabaseName::Main, staged.path(), None::<fn(rusqlite::backup::Progress)>)
                .map_err(|e| {
                    tracing::debug!("Snapshot restore failed: {}", e);
                    Error::DecodeFailure("snapshot image is incomplete or malformed".to_string())
                })?;
            tracing::debug!("Restored {} byte snapshot", bytes.len());
        }

        Ok(Database {
            conn,
            scratch_dir: self.scratch_dir.clone(),
        })
    }
}

fn stage_in(dir: &Path) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("snapshot-")
        .suffix(".db")
        .tempfile_in(dir)
        .map_err(|e| {
            Error::EngineUnavailable(format!("cannot stage snapshot in {}: {}", dir.display(), e))
        })
}

/// Live in-memory database holding the steg table
pub struct Database {
    conn: Connection,
    scratch_dir: PathBuf,
}

impl Database {
    /// Create the schema if it does not exist yet
    pub fn bootstrap(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute_batch(stmt)?;
        }
        Ok(())
    }

    /// Insert a record in its own transaction.
    ///
    /// A duplicate code is reported as `Error::ConstraintViolation` and leaves
    /// the table untouched.
    pub fn insert(&mut self, record: &Record) -> Result<()> {
        let tx = self.conn.transaction()?;
        match tx.execute(schema::INSERT_RECORD, params![record.code, record.image]) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(Error::ConstraintViolation { code: record.code.clone() });
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove the record with the given code; returns whether a row was deleted
    pub fn delete(&mut self, code: &str) -> Result<bool> {
        let removed = self.conn.execute(schema::DELETE_RECORD, [code])?;
        Ok(removed > 0)
    }

    /// All records in the engine's default scan order
    pub fn scan(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(schema::SELECT_ALL_RECORDS)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Count all records
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(schema::COUNT_RECORDS, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Export the whole database as a SQLite file image
    pub fn export(&self) -> Result<Vec<u8>> {
        let staged = stage_in(&self.scratch_dir)?;
        self.conn.backup(DatabaseName::Main, staged.path(), None)?;
        let bytes = std::fs::read(staged.path())?;
        tracing::debug!("Exported {} byte snapshot", bytes.len());
        Ok(bytes)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let image: Option<String> = row.get(schema::IMAGE_COLUMN)?;
    Ok(Record {
        code: row.get(schema::CODE_COLUMN)?,
        image: image.unwrap_or_default(),
    })
}

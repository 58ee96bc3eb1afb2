//! Streaming item reads for the query cache.

use std::path::{Path, PathBuf};

use stt_core::{ItemReader, ItemSource, StorageError, TimeTrackingItem};

use crate::{Database, DbError};

/// Opens a fresh connection to the journal database for every read pass.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for SqliteSource {
    fn open(&self) -> Result<Box<dyn ItemReader + '_>, StorageError> {
        let reader = SqliteItemReader::open(&self.path)?;
        Ok(Box::new(reader))
    }
}

/// Reads items one row at a time in journal order.
///
/// The whole pass runs inside one read transaction, so every row comes from the
/// same state of the journal even while other connections commit changes. The
/// transaction ends and the connection closes when the reader is dropped.
pub struct SqliteItemReader {
    db: Database,
    cursor: Option<(String, i64)>,
    exhausted: bool,
}

impl SqliteItemReader {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::new(Database::open(path)?)
    }

    pub fn new(db: Database) -> Result<Self, DbError> {
        db.conn.execute_batch("BEGIN DEFERRED")?;
        Ok(Self {
            db,
            cursor: None,
            exhausted: false,
        })
    }

    fn next_item(&mut self) -> Result<Option<TimeTrackingItem>, DbError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(row) = self.db.next_item_after(self.cursor.as_ref())? else {
            self.exhausted = true;
            return Ok(None);
        };
        self.cursor = Some((row.start_at.clone(), row.id));
        Ok(Some(row.into_stored()?.item))
    }
}

impl ItemReader for SqliteItemReader {
    fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError> {
        Ok(self.next_item()?)
    }
}

//! Storage layer for the stt journal.
//!
//! Persists time tracking items using `rusqlite`, streams them back in journal
//! order, applies interpreted commands and rotates dated backups of the journal
//! file.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Queries running on other threads read through [`SqliteSource`], which opens its
//! own connection for every read pass.
//!
//! # Schema
//!
//! Timestamps are naive local date-times stored as TEXT (`2024-01-15T10:30:00`,
//! with fractional seconds only when present), so lexicographic ordering matches
//! chronological ordering. Journal order is `start_at` then `id`.

mod backup;
mod journal;
mod reader;

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use stt_core::{StorageError, TimeTrackingItem, ValidationError};
use thiserror::Error;

pub use backup::{BackupOutcome, BackupRotator};
pub use journal::{Applied, Journal};
pub use reader::{SqliteItemReader, SqliteSource};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for item {item_id}: {timestamp}")]
    TimestampParse {
        item_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// An item or command would break the item invariants.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading items from another source failed.
    #[error("failed to read items: {0}")]
    Source(#[from] StorageError),
    /// A filesystem operation on the journal or its backups failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DbError> for StorageError {
    fn from(err: DbError) -> Self {
        Self::with_source("failed to read journal", err)
    }
}

/// An item together with its row ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub id: i64,
    pub item: TimeTrackingItem,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open. File
    /// databases use write-ahead logging so a reader's transaction keeps a stable
    /// view while writers commit.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::trace!(%mode, path = %path.display(), "opened journal");
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- items: one row per tracked activity
            -- start_at/end_at: naive local time, e.g. '2024-01-15T10:30:00'
            -- end_at NULL marks an item that has not ended yet
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                start_at TEXT NOT NULL,
                end_at TEXT,
                comment TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_items_start ON items(start_at, id);
            ",
        )?;
        Ok(())
    }

    /// Inserts a single item and returns its row ID.
    pub fn insert_item(&mut self, item: &TimeTrackingItem) -> Result<i64, DbError> {
        insert_item(&self.conn, item)
    }

    /// Inserts a batch of items in one transaction.
    pub fn insert_items(&mut self, items: &[TimeTrackingItem]) -> Result<usize, DbError> {
        if items.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        for item in items {
            insert_item(&tx, item)?;
        }
        tx.commit()?;
        Ok(items.len())
    }

    /// Lists all items in journal order.
    pub fn list_items(&self) -> Result<Vec<TimeTrackingItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_at, end_at, comment
            FROM items
            ORDER BY start_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], ItemRow::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?.into_stored()?.item);
        }
        Ok(items)
    }

    /// Returns the last item in journal order.
    pub fn last_item(&self) -> Result<Option<StoredItem>, DbError> {
        last_item(&self.conn)
    }

    /// Returns the first item after `cursor` in journal order.
    ///
    /// The cursor is the `(start_at, id)` pair of the previously returned row.
    fn next_item_after(&self, cursor: Option<&(String, i64)>) -> Result<Option<ItemRow>, DbError> {
        let (start_at, id) = cursor.map_or(("", i64::MIN), |(start_at, id)| (start_at.as_str(), *id));
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT id, start_at, end_at, comment
            FROM items
            WHERE start_at > ?1 OR (start_at = ?1 AND id > ?2)
            ORDER BY start_at ASC, id ASC
            LIMIT 1
            ",
        )?;
        Ok(stmt
            .query_row(params![start_at, id], ItemRow::from_row)
            .optional()?)
    }
}

/// A raw row from the `items` table.
#[derive(Debug)]
struct ItemRow {
    id: i64,
    start_at: String,
    end_at: Option<String>,
    comment: Option<String>,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_at: row.get(1)?,
            end_at: row.get(2)?,
            comment: row.get(3)?,
        })
    }

    fn into_stored(self) -> Result<StoredItem, DbError> {
        let start = parse_timestamp(&self.start_at, self.id)?;
        let end = self
            .end_at
            .as_deref()
            .map(|end| parse_timestamp(end, self.id))
            .transpose()?;
        let item = TimeTrackingItem::new(self.comment, start, end)?;
        Ok(StoredItem { id: self.id, item })
    }
}

fn insert_item(conn: &Connection, item: &TimeTrackingItem) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO items (start_at, end_at, comment) VALUES (?, ?, ?)",
        params![
            format_timestamp(item.start()),
            item.end().map(format_timestamp),
            item.comment(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn last_item(conn: &Connection) -> Result<Option<StoredItem>, DbError> {
    conn.query_row(
        "
        SELECT id, start_at, end_at, comment
        FROM items
        ORDER BY start_at DESC, id DESC
        LIMIT 1
        ",
        [],
        ItemRow::from_row,
    )
    .optional()?
    .map(ItemRow::into_stored)
    .transpose()
}

fn set_end(conn: &Connection, id: i64, end: NaiveDateTime) -> Result<(), DbError> {
    conn.execute(
        "UPDATE items SET end_at = ? WHERE id = ?",
        params![format_timestamp(end), id],
    )?;
    Ok(())
}

fn delete_item(conn: &Connection, id: i64) -> Result<(), DbError> {
    conn.execute("DELETE FROM items WHERE id = ?", [id])?;
    Ok(())
}

fn parse_timestamp(timestamp: &str, item_id: i64) -> Result<NaiveDateTime, DbError> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|source| {
        DbError::TimestampParse {
            item_id,
            timestamp: timestamp.to_string(),
            source,
        }
    })
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    pub fn item(comment: &str, start: &str, end: Option<&str>) -> TimeTrackingItem {
        TimeTrackingItem::new(Some(comment.to_string()), dt(start), end.map(dt)).unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn timestamps_are_stored_as_iso_text() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_item(&item("a", "2020-01-01 10:00", Some("2020-01-01 11:30")))
            .unwrap();
        let (start, end): (String, String) = db
            .conn
            .query_row("SELECT start_at, end_at FROM items", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(start, "2020-01-01T10:00:00");
        assert_eq!(end, "2020-01-01T11:30:00");
    }

    #[test]
    fn list_items_returns_journal_order() {
        let mut db = Database::open_in_memory().unwrap();
        let late = item("late", "2020-01-02 10:00", None);
        let early = item("early", "2020-01-01 10:00", Some("2020-01-01 11:00"));
        let early_twin = item("twin", "2020-01-01 10:00", Some("2020-01-01 10:30"));
        db.insert_items(&[late.clone(), early.clone(), early_twin.clone()])
            .unwrap();

        assert_eq!(db.list_items().unwrap(), vec![early, early_twin, late.clone()]);
        assert_eq!(db.last_item().unwrap().unwrap().item, late);
    }

    #[test]
    fn empty_comment_round_trips_as_none() {
        let mut db = Database::open_in_memory().unwrap();
        let item = TimeTrackingItem::ongoing(None, dt("2020-01-01 10:00"));
        db.insert_item(&item).unwrap();
        assert_eq!(db.list_items().unwrap(), vec![item]);
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute("INSERT INTO items (start_at) VALUES ('yesterday')", [])
            .unwrap();
        let err = db.list_items().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { .. }));
    }

    #[test]
    fn next_item_after_walks_ties_by_id() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_items(&[
            item("a", "2020-01-01 10:00", None),
            item("b", "2020-01-01 10:00", None),
        ])
        .unwrap();

        let first = db.next_item_after(None).unwrap().unwrap();
        assert_eq!(first.comment.as_deref(), Some("a"));
        let cursor = (first.start_at, first.id);
        let second = db.next_item_after(Some(&cursor)).unwrap().unwrap();
        assert_eq!(second.comment.as_deref(), Some("b"));
        let cursor = (second.start_at, second.id);
        assert!(db.next_item_after(Some(&cursor)).unwrap().is_none());
    }
}

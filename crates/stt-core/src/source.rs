//! Sequential access to persisted items.

use std::error::Error as StdError;

use thiserror::Error;

use crate::types::TimeTrackingItem;

/// Reading persisted items failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// A cursor over persisted items in their stored order.
///
/// The underlying handle is released when the reader is dropped.
pub trait ItemReader {
    /// Returns the next item, or `None` at the end of the stream.
    fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError>;
}

impl<R: ItemReader + ?Sized> ItemReader for Box<R> {
    fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError> {
        (**self).read()
    }
}

/// Opens fresh readers over the journal.
pub trait ItemSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn ItemReader + '_>, StorageError>;
}

/// Reads every remaining item from `reader`.
pub fn read_all<R: ItemReader + ?Sized>(reader: &mut R) -> Result<Vec<TimeTrackingItem>, StorageError> {
    let mut items = Vec::new();
    while let Some(item) = reader.read()? {
        items.push(item);
    }
    Ok(items)
}

/// An in-memory reader, mostly useful for tests and imports.
#[derive(Debug, Clone, Default)]
pub struct VecReader {
    items: std::collections::VecDeque<TimeTrackingItem>,
}

impl VecReader {
    pub fn new(items: impl IntoIterator<Item = TimeTrackingItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl ItemReader for VecReader {
    fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError> {
        Ok(self.items.pop_front())
    }
}

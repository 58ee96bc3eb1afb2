//! Applying commands to the journal.

use std::sync::Arc;

use chrono::NaiveDateTime;
use stt_core::{Command, EventBus, ItemModified, ItemReader, Modification, TimeTrackingItem, read_all};

use crate::{Database, DbError, delete_item, insert_item, last_item, set_end};

/// What applying a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A new item was recorded. `ended` is the previously ongoing item, if it was stopped.
    Started {
        item: TimeTrackingItem,
        ended: Option<TimeTrackingItem>,
    },
    /// The ongoing item was stopped.
    Ended(TimeTrackingItem),
    /// The last activity was resumed as a new item.
    Resumed(TimeTrackingItem),
    /// The command had nothing to act on.
    Nothing,
}

/// The journal database plus the bus that announces its modifications.
pub struct Journal {
    db: Database,
    bus: Arc<EventBus>,
}

impl Journal {
    pub const fn new(db: Database, bus: Arc<EventBus>) -> Self {
        Self { db, bus }
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Applies a command and publishes one [`ItemModified`] if anything changed.
    pub fn apply(&mut self, command: &Command) -> Result<Applied, DbError> {
        tracing::debug!(?command, "applying command");
        let applied = match command {
            Command::NewItem {
                comment,
                start,
                end,
            } => {
                let item = TimeTrackingItem::new(comment.clone(), *start, *end)?;
                self.start_item(item)?
            }
            Command::EndCurrent { at } => self.end_current(*at)?,
            Command::ResumeLast { at } => self.resume_last(*at)?,
        };
        match &applied {
            Applied::Nothing => {}
            Applied::Started { ended: None, .. } => self.publish(Modification::Inserted),
            Applied::Started { .. } | Applied::Ended(_) | Applied::Resumed(_) => {
                self.publish(Modification::Updated);
            }
        }
        Ok(applied)
    }

    /// Copies every item from `reader` into the journal.
    pub fn import(&mut self, reader: &mut dyn ItemReader) -> Result<usize, DbError> {
        let items = read_all(reader)?;
        let inserted = self.db.insert_items(&items)?;
        if inserted > 0 {
            self.publish(Modification::Imported);
        }
        Ok(inserted)
    }

    /// Records `item`, stopping the ongoing item if `item` starts during it.
    ///
    /// A closed item inside the ongoing one interrupts it: the ongoing activity
    /// continues as a new item once `item` ends.
    fn start_item(&mut self, item: TimeTrackingItem) -> Result<Applied, DbError> {
        let tx = self.db.conn.transaction()?;
        let ongoing = last_item(&tx)?
            .filter(|last| last.item.is_ongoing() && last.item.start() <= item.start());

        let mut ended = None;
        if let Some(ongoing) = ongoing {
            if ongoing.item.start() == item.start() && item.is_ongoing() {
                delete_item(&tx, ongoing.id)?;
            } else {
                let stopped = ongoing.item.with_end(item.start())?;
                set_end(&tx, ongoing.id, item.start())?;
                if let Some(end) = item.end() {
                    let continued = TimeTrackingItem::ongoing(
                        ongoing.item.comment().map(str::to_string),
                        end,
                    );
                    insert_item(&tx, &continued)?;
                }
                ended = Some(stopped);
            }
        }
        insert_item(&tx, &item)?;
        tx.commit()?;
        Ok(Applied::Started { item, ended })
    }

    fn end_current(&mut self, at: NaiveDateTime) -> Result<Applied, DbError> {
        let tx = self.db.conn.transaction()?;
        let Some(ongoing) = last_item(&tx)?.filter(|last| last.item.is_ongoing()) else {
            return Ok(Applied::Nothing);
        };
        let ended = ongoing.item.with_end(at)?;
        set_end(&tx, ongoing.id, at)?;
        tx.commit()?;
        Ok(Applied::Ended(ended))
    }

    fn resume_last(&mut self, at: NaiveDateTime) -> Result<Applied, DbError> {
        let tx = self.db.conn.transaction()?;
        let Some(last) = last_item(&tx)? else {
            return Ok(Applied::Nothing);
        };
        if last.item.is_ongoing() {
            last.item.with_end(at)?;
            set_end(&tx, last.id, at)?;
        }
        let resumed = TimeTrackingItem::ongoing(last.item.comment().map(str::to_string), at);
        insert_item(&tx, &resumed)?;
        tx.commit()?;
        Ok(Applied::Resumed(resumed))
    }

    fn publish(&self, kind: Modification) {
        self.bus.publish(&ItemModified { kind });
    }
}

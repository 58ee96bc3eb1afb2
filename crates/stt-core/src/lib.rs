//! Core domain logic for the stt time tracking journal.
//!
//! This crate contains:
//! - Command interpretation: turning English command text into [`Command`]s
//! - Time expression resolution against configurable date-time layouts
//! - Queries over the journal through a lazily built, invalidatable cache
//! - Import of the plain-text journal format and overtime reporting

pub mod bus;
pub mod command;
pub mod grammar;
pub mod importer;
pub mod query;
pub mod report;
pub mod source;
pub mod time;
mod types;

pub use bus::{EventBus, ItemModified, Modification};
pub use command::{Command, CommandInterpreter, InterpretError};
pub use query::{ItemQueries, Items};
pub use source::{ItemReader, ItemSource, StorageError, VecReader, read_all};
pub use time::{Clock, DateTimeLayout, FixedClock, FormatError, SystemClock, TimeResolver, TimeUnit};
pub use types::{AdjacentItems, Criteria, TimeRange, TimeTrackingItem, ValidationError};

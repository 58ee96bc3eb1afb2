//! Wiring of journal, queries and command interpreter for one invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use stt_core::{Clock, CommandInterpreter, EventBus, ItemQueries, TimeResolver};
use stt_db::{Database, Journal, SqliteSource};

use crate::Config;

/// An opened journal together with everything needed to query and change it.
pub struct Tracker {
    pub journal: Journal,
    pub queries: Arc<ItemQueries>,
    pub interpreter: CommandInterpreter,
}

impl Tracker {
    /// Opens the configured journal, backing it up first if backups are configured.
    pub fn open(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = &config.database_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }

        if let Some(rotator) = config.backup_rotator() {
            let outcome = rotator
                .run(path, clock.today())
                .context("failed to back up journal")?;
            tracing::debug!(?outcome, "backup rotation finished");
        }

        let db = Database::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let bus = Arc::new(EventBus::new());
        let queries = Arc::new(ItemQueries::new(SqliteSource::new(path)));
        queries.subscribe_to(&bus);

        let resolver = TimeResolver::new(config.layouts()?, clock);
        Ok(Self {
            journal: Journal::new(db, bus),
            queries,
            interpreter: CommandInterpreter::new(resolver),
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        self.interpreter.resolver().now()
    }
}

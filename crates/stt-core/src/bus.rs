//! In-process notification of journal mutations.

use std::sync::{Arc, Mutex, PoisonError};

/// What happened to the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Inserted,
    Updated,
    Imported,
}

/// Published after every change to the persisted journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemModified {
    pub kind: Modification,
}

type Handler = Arc<dyn Fn(&ItemModified) + Send + Sync>;

/// A synchronous publish/subscribe channel for [`ItemModified`] events.
///
/// Handlers run on the publishing thread, in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<Vec<Handler>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("EventBus").field("handlers", &count).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&ItemModified) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    pub fn publish(&self, event: &ItemModified) {
        // Handlers may subscribe or publish themselves, so they run without the lock held.
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tracing::trace!(?event, handlers = handlers.len(), "publishing");
        for handler in handlers {
            handler(event);
        }
    }
}

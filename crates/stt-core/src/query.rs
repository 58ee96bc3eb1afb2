//! Cached queries over the journal.
//!
//! [`ItemQueries`] keeps the whole journal in memory as an immutable snapshot.
//! The snapshot is built lazily on first access and dropped whenever the
//! journal reports a modification, so the next query reads everything again.
//!
//! # Concurrency
//!
//! Building and dropping the snapshot happen under one mutex. Iterators returned
//! by queries own a reference to the snapshot they started on and never take the
//! lock, so an invalidation during iteration only affects later queries.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::NaiveDate;

use crate::bus::EventBus;
use crate::source::{ItemSource, StorageError, read_all};
use crate::types::{AdjacentItems, Criteria, TimeTrackingItem};

/// Cache slot state.
#[derive(Debug)]
enum Cache {
    Unbuilt,
    Valid(Arc<[TimeTrackingItem]>),
}

/// Query engine over a journal [`ItemSource`].
pub struct ItemQueries {
    source: Box<dyn ItemSource>,
    cache: Mutex<Cache>,
}

impl std::fmt::Debug for ItemQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemQueries")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ItemQueries {
    pub fn new(source: impl ItemSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: Mutex::new(Cache::Unbuilt),
        }
    }

    /// Invalidates this engine's cache on every event published on `bus`.
    ///
    /// The subscription only holds a weak reference, so it does not keep the
    /// engine alive.
    pub fn subscribe_to(self: &Arc<Self>, bus: &EventBus) {
        let queries = Arc::downgrade(self);
        bus.subscribe(move |_| {
            if let Some(queries) = queries.upgrade() {
                queries.invalidate();
            }
        });
    }

    /// Drops the cached snapshot. The next query rebuilds it.
    pub fn invalidate(&self) {
        *self.lock() = Cache::Unbuilt;
        tracing::debug!("clearing query cache");
    }

    /// Whether a snapshot is currently cached.
    pub fn is_cached(&self) -> bool {
        matches!(*self.lock(), Cache::Valid(_))
    }

    /// All items, in persisted order.
    pub fn all_items(&self) -> Result<Items, StorageError> {
        Ok(Items::new(self.snapshot()?))
    }

    /// Items accepted by `predicate`, in persisted order.
    pub fn items_matching<P>(
        &self,
        predicate: P,
    ) -> Result<impl Iterator<Item = TimeTrackingItem> + use<P>, StorageError>
    where
        P: FnMut(&TimeTrackingItem) -> bool,
    {
        Ok(self.all_items()?.filter(predicate))
    }

    /// Items matching `criteria`, in persisted order.
    pub fn items(
        &self,
        criteria: Criteria,
    ) -> Result<impl Iterator<Item = TimeTrackingItem> + use<>, StorageError> {
        self.items_matching(move |item| criteria.matches(item))
    }

    /// Distinct start days, in order of first appearance.
    pub fn tracked_days(&self) -> Result<impl Iterator<Item = NaiveDate> + use<>, StorageError> {
        let mut seen = HashSet::new();
        Ok(self
            .all_items()?
            .map(|item| item.start_date())
            .filter(move |day| seen.insert(*day)))
    }

    /// The first item of each start day, in persisted order.
    pub fn first_items_of_days(
        &self,
    ) -> Result<impl Iterator<Item = TimeTrackingItem> + use<>, StorageError> {
        let mut seen = HashSet::new();
        self.items_matching(move |item| seen.insert(item.start_date()))
    }

    /// The last item in persisted order.
    pub fn last_item(&self) -> Result<Option<TimeTrackingItem>, StorageError> {
        Ok(self.snapshot()?.last().cloned())
    }

    /// The last item, if it has no end.
    ///
    /// Items without an end anywhere else in the journal are not considered ongoing.
    pub fn ongoing_item(&self) -> Result<Option<TimeTrackingItem>, StorageError> {
        Ok(self.last_item()?.filter(TimeTrackingItem::is_ongoing))
    }

    /// The items directly before and after `item`, if there is no gap between them.
    pub fn adjacent_items(&self, item: &TimeTrackingItem) -> Result<AdjacentItems, StorageError> {
        let items = self.snapshot()?;
        let Some(index) = items.iter().position(|candidate| candidate == item) else {
            return Ok(AdjacentItems::default());
        };
        let previous = index
            .checked_sub(1)
            .map(|i| &items[i])
            .filter(|previous| previous.end() == Some(item.start()))
            .cloned();
        let next = items
            .get(index + 1)
            .filter(|next| item.end() == Some(next.start()))
            .cloned();
        Ok(AdjacentItems { previous, next })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cache> {
        // The slot is only ever assigned complete values, so a poisoned lock is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Result<Arc<[TimeTrackingItem]>, StorageError> {
        let mut cache = self.lock();
        if let Cache::Valid(items) = &*cache {
            return Ok(Arc::clone(items));
        }
        let items: Arc<[TimeTrackingItem]> = self.rebuild()?.into();
        *cache = Cache::Valid(Arc::clone(&items));
        Ok(items)
    }

    fn rebuild(&self) -> Result<Vec<TimeTrackingItem>, StorageError> {
        tracing::debug!("rebuilding query cache");
        let started = Instant::now();
        let items = {
            let mut reader = self.source.open()?;
            read_all(&mut reader)?
        };
        tracing::debug!(
            items = items.len(),
            elapsed = ?started.elapsed(),
            "query cache rebuilt"
        );
        Ok(items)
    }
}

/// Iterator over one snapshot of the journal.
#[derive(Debug, Clone)]
pub struct Items {
    items: Arc<[TimeTrackingItem]>,
    next: usize,
}

impl Items {
    const fn new(items: Arc<[TimeTrackingItem]>) -> Self {
        Self { items, next: 0 }
    }
}

impl Iterator for Items {
    type Item = TimeTrackingItem;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.next)?.clone();
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.items.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Items {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::bus::{ItemModified, Modification};
    use crate::source::ItemReader;
    use crate::types::tests::{dt, item};

    /// Journal fake that counts opened and closed readers.
    #[derive(Default)]
    struct FakeJournal {
        items: Mutex<Vec<TimeTrackingItem>>,
        opened: AtomicUsize,
        closed: AtomicUsize,
        fail_next_read: AtomicBool,
    }

    impl FakeJournal {
        fn with_items(items: Vec<TimeTrackingItem>) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(items),
                ..Self::default()
            })
        }

        fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    struct FakeReader<'a> {
        journal: &'a FakeJournal,
        items: std::vec::IntoIter<TimeTrackingItem>,
    }

    impl ItemReader for FakeReader<'_> {
        fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError> {
            if self.journal.fail_next_read.swap(false, Ordering::SeqCst) {
                return Err(StorageError::new("read failed"));
            }
            Ok(self.items.next())
        }
    }

    impl Drop for FakeReader<'_> {
        fn drop(&mut self) {
            self.journal.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SharedJournal(Arc<FakeJournal>);

    impl ItemSource for SharedJournal {
        fn open(&self) -> Result<Box<dyn ItemReader + '_>, StorageError> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            let items = self.0.items.lock().unwrap().clone();
            Ok(Box::new(FakeReader {
                journal: &self.0,
                items: items.into_iter(),
            }))
        }
    }

    fn engine(items: Vec<TimeTrackingItem>) -> (ItemQueries, Arc<FakeJournal>) {
        let journal = FakeJournal::with_items(items);
        (ItemQueries::new(SharedJournal(Arc::clone(&journal))), journal)
    }

    #[test]
    fn empty_journal() {
        let (queries, _) = engine(Vec::new());
        assert_eq!(queries.all_items().unwrap().count(), 0);
        assert_eq!(queries.last_item().unwrap(), None);
        assert_eq!(queries.ongoing_item().unwrap(), None);
        assert_eq!(queries.tracked_days().unwrap().count(), 0);
    }

    #[test]
    fn all_items_keeps_persisted_order() {
        let items = vec![
            item("b", "2020-01-02 10:00", Some("2020-01-02 11:00")),
            item("a", "2020-01-01 10:00", Some("2020-01-01 11:00")),
        ];
        let (queries, _) = engine(items.clone());
        assert_eq!(queries.all_items().unwrap().collect::<Vec<_>>(), items);
        assert_eq!(queries.all_items().unwrap().len(), 2);
    }

    #[test]
    fn queries_share_one_read_pass() {
        let (queries, journal) = engine(vec![item("a", "2020-01-01 10:00", None)]);
        assert!(!queries.is_cached());
        assert_eq!(journal.opened(), 0);

        queries.all_items().unwrap().for_each(drop);
        queries.last_item().unwrap();
        queries.tracked_days().unwrap().for_each(drop);
        assert_eq!(journal.opened(), 1);
        assert_eq!(journal.closed(), 1);
        assert!(queries.is_cached());
    }

    #[test]
    fn invalidate_triggers_exactly_one_fresh_read() {
        let (queries, journal) = engine(vec![item("a", "2020-01-01 10:00", None)]);
        queries.last_item().unwrap();
        assert_eq!(journal.opened(), 1);

        journal
            .items
            .lock()
            .unwrap()
            .push(item("b", "2020-01-01 11:00", None));
        queries.invalidate();
        assert_eq!(journal.opened(), 1);

        assert_eq!(
            queries.last_item().unwrap(),
            Some(item("b", "2020-01-01 11:00", None))
        );
        queries.ongoing_item().unwrap();
        assert_eq!(journal.opened(), 2);
    }

    #[test]
    fn bus_events_invalidate() {
        let bus = EventBus::new();
        let (queries, journal) = engine(vec![item("a", "2020-01-01 10:00", None)]);
        let queries = Arc::new(queries);
        queries.subscribe_to(&bus);

        queries.last_item().unwrap();
        bus.publish(&ItemModified {
            kind: Modification::Inserted,
        });
        assert!(!queries.is_cached());
        queries.last_item().unwrap();
        assert_eq!(journal.opened(), 2);
    }

    #[test]
    fn subscription_does_not_keep_engine_alive() {
        let bus = EventBus::new();
        let (queries, _) = engine(Vec::new());
        let queries = Arc::new(queries);
        queries.subscribe_to(&bus);
        let weak = Arc::downgrade(&queries);
        drop(queries);
        assert!(weak.upgrade().is_none());
        bus.publish(&ItemModified {
            kind: Modification::Updated,
        });
    }

    #[test]
    fn failed_rebuild_leaves_cache_unbuilt() {
        let (queries, journal) = engine(vec![item("a", "2020-01-01 10:00", None)]);
        journal.fail_next_read.store(true, Ordering::SeqCst);

        let err = queries.all_items().unwrap_err();
        assert_eq!(err.to_string(), "read failed");
        assert!(!queries.is_cached());
        assert_eq!(journal.closed(), 1);

        assert_eq!(queries.all_items().unwrap().count(), 1);
        assert_eq!(journal.opened(), 2);
        assert_eq!(journal.closed(), 2);
    }

    #[test]
    fn iteration_survives_concurrent_invalidation() {
        let (queries, journal) = engine(vec![
            item("a", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("b", "2020-01-01 11:00", None),
        ]);
        let queries = Arc::new(queries);
        let mut items = queries.all_items().unwrap();
        assert_eq!(items.next().unwrap().comment(), Some("a"));

        journal.items.lock().unwrap().clear();
        let other = Arc::clone(&queries);
        thread::spawn(move || other.invalidate()).join().unwrap();

        assert_eq!(items.next().unwrap().comment(), Some("b"));
        assert_eq!(items.next(), None);
        assert_eq!(queries.all_items().unwrap().count(), 0);
    }

    #[test]
    fn concurrent_first_access_rebuilds_once() {
        let (queries, journal) = engine(vec![item("a", "2020-01-01 10:00", None)]);
        let queries = Arc::new(queries);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queries = Arc::clone(&queries);
                thread::spawn(move || queries.all_items().unwrap().count())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(journal.opened(), 1);
    }

    #[test]
    fn tracked_days_in_order_of_first_appearance() {
        let (queries, _) = engine(vec![
            item("a", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("b", "2020-01-02 10:00", Some("2020-01-02 11:00")),
            item("c", "2020-01-01 12:00", Some("2020-01-01 13:00")),
        ]);
        let days: Vec<_> = queries.tracked_days().unwrap().collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn first_items_of_days() {
        let (queries, _) = engine(vec![
            item("a", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("b", "2020-01-01 11:00", Some("2020-01-01 12:00")),
            item("c", "2020-01-02 09:00", Some("2020-01-02 10:00")),
            item("d", "2020-01-02 10:00", None),
        ]);
        let comments: Vec<_> = queries
            .first_items_of_days()
            .unwrap()
            .map(|item| item.comment().unwrap().to_string())
            .collect();
        assert_eq!(comments, vec!["a", "c"]);
    }

    #[test]
    fn items_by_criteria() {
        let (queries, _) = engine(vec![
            item("code review", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("coding", "2020-01-01 11:00", Some("2020-01-01 12:00")),
            item("review notes", "2020-01-02 09:00", None),
        ]);
        let found: Vec<_> = queries
            .items(Criteria::new().comment_contains("review"))
            .unwrap()
            .collect();
        assert_eq!(found.len(), 2);

        let found: Vec<_> = queries
            .items_matching(|item| item.is_ongoing())
            .unwrap()
            .collect();
        assert_eq!(found, vec![item("review notes", "2020-01-02 09:00", None)]);
    }

    #[test]
    fn last_item_is_position_based() {
        let (queries, _) = engine(vec![
            item("late", "2020-01-05 10:00", Some("2020-01-05 11:00")),
            item("early", "2020-01-01 10:00", Some("2020-01-01 11:00")),
        ]);
        assert_eq!(
            queries.last_item().unwrap().unwrap().comment(),
            Some("early")
        );
    }

    #[test]
    fn ongoing_only_for_open_last_item() {
        let (queries, _) = engine(vec![
            item("a", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("b", "2020-01-01 11:00", None),
        ]);
        assert_eq!(
            queries.ongoing_item().unwrap(),
            Some(item("b", "2020-01-01 11:00", None))
        );

        let (queries, _) = engine(vec![
            item("open", "2020-01-01 10:00", None),
            item("closed", "2020-01-01 11:00", Some("2020-01-01 12:00")),
        ]);
        assert!(queries.last_item().unwrap().is_some());
        assert_eq!(queries.ongoing_item().unwrap(), None);
    }

    #[test]
    fn adjacent_items_require_exact_contiguity() {
        let a = item("a", "2020-01-01 10:00", Some("2020-01-01 11:00"));
        let b = item("b", "2020-01-01 11:00", Some("2020-01-01 12:00"));
        let c = item("c", "2020-01-01 12:01", Some("2020-01-01 13:00"));
        let d = item("d", "2020-01-01 13:00", None);
        let (queries, _) = engine(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

        let adjacent = queries.adjacent_items(&b).unwrap();
        assert_eq!(adjacent.previous, Some(a.clone()));
        assert_eq!(adjacent.next, None);

        let adjacent = queries.adjacent_items(&a).unwrap();
        assert_eq!(adjacent.previous, None);
        assert_eq!(adjacent.next, Some(b));

        let adjacent = queries.adjacent_items(&c).unwrap();
        assert_eq!(adjacent.previous, None);
        assert_eq!(adjacent.next, Some(d.clone()));

        let adjacent = queries.adjacent_items(&d).unwrap();
        assert_eq!(adjacent.previous, Some(c));
        assert_eq!(adjacent.next, None);
    }

    #[test]
    fn adjacent_items_of_unknown_item_are_empty() {
        let (queries, _) = engine(vec![item("a", "2020-01-01 10:00", Some("2020-01-01 11:00"))]);
        let stranger = item("x", "2020-01-01 11:00", None);
        assert_eq!(queries.adjacent_items(&stranger).unwrap(), AdjacentItems::default());
    }

    #[test]
    fn next_exists_iff_following_item_starts_at_end() {
        let items = vec![
            item("a", "2020-01-01 08:00", Some("2020-01-01 09:00")),
            item("b", "2020-01-01 09:00", Some("2020-01-01 09:30")),
            item("c", "2020-01-01 10:00", Some("2020-01-01 11:00")),
            item("d", "2020-01-01 11:00", Some("2020-01-01 11:00")),
            item("e", "2020-01-01 11:00", None),
        ];
        let (queries, _) = engine(items.clone());
        for (index, current) in items.iter().enumerate() {
            let Some(end) = current.end() else { continue };
            let expected = items.get(index + 1).filter(|next| next.start() == end);
            let next = queries.adjacent_items(current).unwrap().next;
            assert_eq!(next.as_ref(), expected, "{current}");
        }
        assert_eq!(queries.adjacent_items(&items[4]).unwrap().previous, Some(items[3].clone()));
        assert_eq!(items[4].start(), dt("2020-01-01 11:00"));
    }
}

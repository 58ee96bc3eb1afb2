//! Core type definitions with validation.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The item would end before it starts.
    #[error("item cannot end at {end} before it starts at {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// One recorded activity interval in the journal.
///
/// Items compare by value: two items with the same comment, start and end are
/// the same item as far as queries are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimeTrackingItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    start: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDateTime>,
}

impl TimeTrackingItem {
    /// Creates an item, checking that `end` is not before `start`.
    pub fn new(
        comment: Option<String>,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<Self, ValidationError> {
        if let Some(end) = end {
            if end < start {
                return Err(ValidationError::EndBeforeStart { start, end });
            }
        }
        Ok(Self {
            comment,
            start,
            end,
        })
    }

    /// Creates an item without an end.
    pub const fn ongoing(comment: Option<String>, start: NaiveDateTime) -> Self {
        Self {
            comment,
            start,
            end: None,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub const fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    /// Calendar day the item starts on.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub const fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    /// Returns a copy of this item ending at `end`.
    pub fn with_end(&self, end: NaiveDateTime) -> Result<Self, ValidationError> {
        Self::new(self.comment.clone(), self.start, Some(end))
    }
}

impl fmt::Display for TimeTrackingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%Y-%m-%d %H:%M:%S"))?;
        match self.end {
            Some(end) => write!(f, " - {}", end.format("%Y-%m-%d %H:%M:%S"))?,
            None => write!(f, " - ...")?,
        }
        if let Some(comment) = &self.comment {
            write!(f, " {comment}")?;
        }
        Ok(())
    }
}

/// A resolved time span. A missing `end` means the span is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl TimeRange {
    pub const fn open(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    pub const fn closed(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }
}

/// The items directly before and after a given item, without any gap between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacentItems {
    pub previous: Option<TimeTrackingItem>,
    pub next: Option<TimeTrackingItem>,
}

/// Reusable filter over items. Every filter that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    starts_at_or_after: Option<NaiveDateTime>,
    starts_before: Option<NaiveDateTime>,
    ends_at_or_before: Option<NaiveDateTime>,
    comment_contains: Option<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn starts_at_or_after(mut self, at: NaiveDateTime) -> Self {
        self.starts_at_or_after = Some(at);
        self
    }

    #[must_use]
    pub const fn starts_before(mut self, at: NaiveDateTime) -> Self {
        self.starts_before = Some(at);
        self
    }

    #[must_use]
    pub const fn ends_at_or_before(mut self, at: NaiveDateTime) -> Self {
        self.ends_at_or_before = Some(at);
        self
    }

    #[must_use]
    pub fn comment_contains(mut self, text: impl Into<String>) -> Self {
        self.comment_contains = Some(text.into());
        self
    }

    /// Restricts the criteria to items starting on `day`.
    #[must_use]
    pub fn on_day(self, day: NaiveDate) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN);
        let next = start + chrono::Duration::days(1);
        self.starts_at_or_after(start).starts_before(next)
    }

    pub fn matches(&self, item: &TimeTrackingItem) -> bool {
        if self.starts_at_or_after.is_some_and(|at| item.start < at) {
            return false;
        }
        if self.starts_before.is_some_and(|at| item.start >= at) {
            return false;
        }
        if let Some(at) = self.ends_at_or_before {
            // Ongoing items have no end yet, so they never satisfy an end bound.
            if item.end.is_none_or(|end| end > at) {
                return false;
            }
        }
        if let Some(needle) = &self.comment_contains {
            if !item.comment().is_some_and(|c| c.contains(needle.as_str())) {
                return false;
            }
        }
        true
    }
}

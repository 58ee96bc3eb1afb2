//! Overtime reporting.
//!
//! Work items are summed per start day and compared against the configured
//! working time for that weekday. Items whose comment names a break do not count.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

use crate::types::TimeTrackingItem;

/// Whether an item counts as work time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    WorkTime,
    Break,
}

/// Sorts items into work and breaks by their comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCategorizer {
    break_comments: Vec<String>,
}

impl Default for ItemCategorizer {
    fn default() -> Self {
        Self::new(["pause", "break", "lunch"])
    }
}

impl ItemCategorizer {
    pub fn new<S: Into<String>>(break_comments: impl IntoIterator<Item = S>) -> Self {
        Self {
            break_comments: break_comments
                .into_iter()
                .map(|comment| {
                    let comment: String = comment.into();
                    comment.to_lowercase()
                })
                .collect(),
        }
    }

    /// Items without a comment count as work.
    pub fn category(&self, comment: Option<&str>) -> ItemCategory {
        let Some(comment) = comment else {
            return ItemCategory::WorkTime;
        };
        let comment = comment.trim().to_lowercase();
        if self.break_comments.iter().any(|b| *b == comment) {
            ItemCategory::Break
        } else {
            ItemCategory::WorkTime
        }
    }
}

/// Expected working time per weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTime {
    per_weekday: [Duration; 7],
}

impl Default for WorkingTime {
    fn default() -> Self {
        Self::weekdays(Duration::hours(8))
    }
}

impl WorkingTime {
    /// `daily` on Monday to Friday, nothing on weekends.
    pub fn weekdays(daily: Duration) -> Self {
        let mut per_weekday = [daily; 7];
        per_weekday[Weekday::Sat.num_days_from_monday() as usize] = Duration::zero();
        per_weekday[Weekday::Sun.num_days_from_monday() as usize] = Duration::zero();
        Self { per_weekday }
    }

    pub fn set(&mut self, weekday: Weekday, duration: Duration) {
        self.per_weekday[weekday.num_days_from_monday() as usize] = duration;
    }

    pub fn for_date(&self, date: NaiveDate) -> Duration {
        self.per_weekday[date.weekday().num_days_from_monday() as usize]
    }
}

/// Computes overtime per start day. Ongoing items count until `now`.
///
/// Only days with at least one work item appear in the result.
pub fn overtime(
    items: impl IntoIterator<Item = TimeTrackingItem>,
    categorizer: &ItemCategorizer,
    working_time: &WorkingTime,
    now: NaiveDateTime,
) -> BTreeMap<NaiveDate, Duration> {
    let mut per_day = BTreeMap::new();
    for item in items {
        if categorizer.category(item.comment()) != ItemCategory::WorkTime {
            continue;
        }
        let day = item.start_date();
        let worked = item.end().unwrap_or(now) - item.start();
        per_day
            .entry(day)
            .and_modify(|overtime| *overtime += worked)
            .or_insert_with(|| worked - working_time.for_date(day));
    }
    per_day
}

/// Formats a signed duration as `[-]H:MM`.
pub fn format_duration(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { "-" } else { "" };
    let minutes = duration.num_minutes().abs();
    format!("{sign}{}:{:02}", minutes / 60, minutes % 60)
}

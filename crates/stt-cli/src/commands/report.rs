//! Day report: the items of one day with their durations.
//!
//! Items that start exactly where the previous item ended are marked as
//! continuing it; anything else is preceded by a gap marker.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use stt_core::report::format_duration;
use stt_core::{Criteria, ItemQueries};

#[derive(Debug, Serialize)]
struct ReportEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    start: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDateTime>,
    minutes: i64,
    continues_previous: bool,
    continued_by_next: bool,
}

#[derive(Debug, Serialize)]
struct DayReport {
    day: NaiveDate,
    entries: Vec<ReportEntry>,
    total_minutes: i64,
}

fn build_report(queries: &ItemQueries, day: NaiveDate, now: NaiveDateTime) -> Result<DayReport> {
    let mut entries = Vec::new();
    let mut total = Duration::zero();
    for item in queries.items(Criteria::new().on_day(day))? {
        let adjacent = queries.adjacent_items(&item)?;
        let duration = item.end().unwrap_or(now) - item.start();
        total += duration;
        entries.push(ReportEntry {
            comment: item.comment().map(str::to_string),
            start: item.start(),
            end: item.end(),
            minutes: duration.num_minutes(),
            continues_previous: adjacent.previous.is_some(),
            continued_by_next: adjacent.next.is_some(),
        });
    }
    Ok(DayReport {
        day,
        entries,
        total_minutes: total.num_minutes(),
    })
}

pub fn run<W: Write>(
    writer: &mut W,
    queries: &ItemQueries,
    day: NaiveDate,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let report = build_report(queries, day, now)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(writer, "{}", report.day.format("%A, %Y-%m-%d"))?;
    if report.entries.is_empty() {
        writeln!(writer, "No items tracked.")?;
        return Ok(());
    }
    for (index, entry) in report.entries.iter().enumerate() {
        if index > 0 && !entry.continues_previous {
            writeln!(writer, "  ...")?;
        }
        let end = entry
            .end
            .map_or_else(|| "now  ".to_string(), |end| end.format("%H:%M").to_string());
        writeln!(
            writer,
            "  {} - {end}  {:>6}  {}",
            entry.start.format("%H:%M"),
            format_duration(Duration::minutes(entry.minutes)),
            entry.comment.as_deref().unwrap_or("")
        )?;
    }
    writeln!(
        writer,
        "Total: {}",
        format_duration(Duration::minutes(report.total_minutes))
    )?;
    Ok(())
}

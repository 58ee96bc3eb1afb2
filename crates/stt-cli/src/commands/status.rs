//! Status command for showing the ongoing item.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use stt_core::report::format_duration;
use stt_core::{ItemQueries, TimeTrackingItem};

#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    ongoing: Option<&'a TimeTrackingItem>,
    elapsed_minutes: Option<i64>,
}

pub fn run<W: Write>(writer: &mut W, queries: &ItemQueries, now: NaiveDateTime, json: bool) -> Result<()> {
    let ongoing = queries.ongoing_item()?;
    let elapsed = ongoing.as_ref().map(|item| now - item.start());

    if json {
        let output = StatusOutput {
            ongoing: ongoing.as_ref(),
            elapsed_minutes: elapsed.map(|elapsed| elapsed.num_minutes()),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
        return Ok(());
    }

    match (ongoing, elapsed) {
        (Some(item), Some(elapsed)) => {
            writeln!(writer, "Tracking: {item}")?;
            writeln!(writer, "Elapsed: {}", format_duration(elapsed))?;
        }
        _ => writeln!(writer, "Nothing is being tracked.")?,
    }
    Ok(())
}

//! Overtime per day.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use stt_core::ItemQueries;
use stt_core::report::{ItemCategorizer, WorkingTime, format_duration, overtime};

pub fn run<W: Write>(
    writer: &mut W,
    queries: &ItemQueries,
    categorizer: &ItemCategorizer,
    working_time: &WorkingTime,
    now: NaiveDateTime,
) -> Result<()> {
    let per_day = overtime(queries.all_items()?, categorizer, working_time, now);
    if per_day.is_empty() {
        writeln!(writer, "No working time tracked.")?;
        return Ok(());
    }

    let mut total = Duration::zero();
    for (day, balance) in &per_day {
        total += *balance;
        writeln!(writer, "{}  {:>6}", day.format("%Y-%m-%d %a"), format_duration(*balance))?;
    }
    writeln!(writer, "Total           {:>6}", format_duration(total))?;
    Ok(())
}

//! Lists tracked days with the first item of each.

use std::io::Write;

use anyhow::Result;
use stt_core::ItemQueries;

pub fn run<W: Write>(writer: &mut W, queries: &ItemQueries) -> Result<()> {
    for item in queries.first_items_of_days()? {
        writeln!(
            writer,
            "{}  {}  {}",
            item.start().format("%Y-%m-%d %a"),
            item.start().format("%H:%M"),
            item.comment().unwrap_or("")
        )?;
    }
    match queries.tracked_days()?.count() {
        0 => writeln!(writer, "No days tracked.")?,
        1 => writeln!(writer, "1 day tracked.")?,
        n => writeln!(writer, "{n} days tracked.")?,
    }
    Ok(())
}

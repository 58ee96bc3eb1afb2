//! Tracking commands: `on`, `fin` and `resume`.

use std::io::Write;

use anyhow::{Context, Result};
use stt_core::Command;
use stt_db::Applied;

use crate::Tracker;

/// Interprets `text`, applies it to the journal and reports what changed.
pub fn run<W: Write>(writer: &mut W, tracker: &mut Tracker, text: &str) -> Result<()> {
    let command = tracker
        .interpreter
        .parse(text)
        .with_context(|| format!("cannot understand '{text}'"))?;
    let applied = tracker
        .journal
        .apply(&command)
        .context("failed to update journal")?;

    match applied {
        Applied::Started { item, ended } => {
            if let Some(ended) = ended {
                writeln!(writer, "Stopped: {ended}")?;
            }
            writeln!(writer, "Started: {item}")?;
        }
        Applied::Ended(item) => writeln!(writer, "Stopped: {item}")?,
        Applied::Resumed(item) => writeln!(writer, "Resumed: {item}")?,
        Applied::Nothing => match command {
            Command::ResumeLast { .. } => writeln!(writer, "Nothing to resume.")?,
            _ => writeln!(writer, "Nothing is being tracked.")?,
        },
    }

    if let Some(ongoing) = tracker.queries.ongoing_item()? {
        writeln!(writer, "Tracking: {ongoing}")?;
    }
    Ok(())
}

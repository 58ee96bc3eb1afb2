//! Backup command: rotates journal backups immediately.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use stt_db::BackupRotator;

pub fn run<W: Write>(
    writer: &mut W,
    rotator: &BackupRotator,
    journal_path: &Path,
    today: NaiveDate,
) -> Result<()> {
    let outcome = rotator
        .run(journal_path, today)
        .context("failed to back up journal")?;

    match &outcome.created {
        Some(path) => writeln!(writer, "Created {}", path.display())?,
        None => writeln!(writer, "Backup is up to date.")?,
    }
    for path in &outcome.removed {
        writeln!(writer, "Removed {}", path.display())?;
    }
    Ok(())
}

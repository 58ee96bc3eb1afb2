//! Import command for loading a plain-text journal into the database.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use stt_core::importer::TiImporter;
use stt_db::Journal;

pub fn run<W: Write>(writer: &mut W, journal: &mut Journal, path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut importer = TiImporter::new(BufReader::new(file));
    let imported = journal
        .import(&mut importer)
        .with_context(|| format!("failed to import {}", path.display()))?;
    tracing::debug!(imported, path = %path.display(), "imported items");
    writeln!(writer, "Imported {imported} items.")?;
    Ok(imported)
}

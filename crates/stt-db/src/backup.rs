//! Dated backups of the journal file.
//!
//! Backups live next to each other in one directory and are named
//! `<journal file name>-<YYYY-MM-DD>`. Files that do not follow that scheme are
//! left alone.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use crate::DbError;

const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// What a rotation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupOutcome {
    pub created: Option<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Creates dated copies of a file and prunes old ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRotator {
    backup_dir: PathBuf,
    retention_count: usize,
    interval_days: u32,
}

impl BackupRotator {
    /// A rotator keeping the `retention_count` most recent backups.
    ///
    /// A retention count of zero disables backups entirely.
    pub fn new(backup_dir: impl Into<PathBuf>, retention_count: usize) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            retention_count,
            interval_days: 1,
        }
    }

    /// Only back up if no backup is younger than `days` days. Values below 1 mean daily.
    #[must_use]
    pub fn with_interval_days(mut self, days: u32) -> Self {
        self.interval_days = days.max(1);
        self
    }

    /// Backs up `source` for `today` if needed, then prunes old backups.
    pub fn run(&self, source: &Path, today: NaiveDate) -> Result<BackupOutcome, DbError> {
        if self.retention_count == 0 {
            return Ok(BackupOutcome::default());
        }
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DbError::Io {
                action: "invalid journal file name",
                path: source.to_path_buf(),
                source: io::Error::from(io::ErrorKind::InvalidInput),
            })?;

        fs::create_dir_all(&self.backup_dir).map_err(|source| DbError::Io {
            action: "failed to create backup directory",
            path: self.backup_dir.clone(),
            source,
        })?;

        let mut backups = self.existing_backups(file_name)?;
        let mut outcome = BackupOutcome::default();

        // An interval reaching past the calendar covers every backup.
        let oldest_fresh = today
            .checked_sub_signed(Duration::days(i64::from(self.interval_days) - 1))
            .unwrap_or(NaiveDate::MIN);
        let has_fresh_backup = backups.iter().any(|(date, _)| *date >= oldest_fresh);
        if !has_fresh_backup && source.exists() {
            let target = self.backup_path(file_name, today);
            if copy_new(source, &target)? {
                tracing::debug!(path = %target.display(), "created backup");
                backups.push((today, target.clone()));
                outcome.created = Some(target);
            }
        }

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, path) in backups.into_iter().skip(self.retention_count) {
            fs::remove_file(&path).map_err(|source| DbError::Io {
                action: "failed to remove old backup",
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "removed old backup");
            outcome.removed.push(path);
        }

        Ok(outcome)
    }

    fn backup_path(&self, file_name: &str, date: NaiveDate) -> PathBuf {
        self.backup_dir
            .join(format!("{file_name}-{}", date.format(DATE_LABEL_FORMAT)))
    }

    /// Lists backups of `file_name` with their date labels.
    fn existing_backups(&self, file_name: &str) -> Result<Vec<(NaiveDate, PathBuf)>, DbError> {
        let entries = fs::read_dir(&self.backup_dir).map_err(|source| DbError::Io {
            action: "failed to list backups in",
            path: self.backup_dir.clone(),
            source,
        })?;
        let prefix = format!("{file_name}-");
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DbError::Io {
                action: "failed to list backups in",
                path: self.backup_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(label) = name.strip_prefix(&prefix) else {
                continue;
            };
            match NaiveDate::parse_from_str(label, DATE_LABEL_FORMAT) {
                Ok(date) => backups.push((date, path)),
                Err(_) => tracing::warn!(path = %path.display(), "skipping file with unknown date label"),
            }
        }
        Ok(backups)
    }
}

/// Copies `source` to a new file at `target`. Returns false if `target` already exists.
///
/// A partially written `target` is removed again if the copy fails.
fn copy_new(source: &Path, target: &Path) -> Result<bool, DbError> {
    let mut input = File::open(source).map_err(|err| DbError::Io {
        action: "failed to open journal",
        path: source.to_path_buf(),
        source: err,
    })?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(source) => {
            return Err(DbError::Io {
                action: "failed to create backup",
                path: target.to_path_buf(),
                source,
            });
        }
    };
    if let Err(source) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        if let Err(err) = fs::remove_file(target) {
            tracing::warn!(path = %target.display(), error = %err, "failed to remove incomplete backup");
        }
        return Err(DbError::Io {
            action: "failed to write backup",
            path: target.to_path_buf(),
            source,
        });
    }
    Ok(true)
}

//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use stt_core::report::{ItemCategorizer, WorkingTime};
use stt_core::time::DEFAULT_LAYOUTS;
use stt_core::DateTimeLayout;
use stt_db::BackupRotator;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the journal database.
    pub database_path: PathBuf,
    /// Date-time layouts tried in order when reading times in commands.
    pub date_time_layouts: Vec<String>,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub overtime: OvertimeConfig,
}

/// Journal backups. Disabled unless `location` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
    pub retention_count: usize,
    pub interval_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            location: None,
            retention_count: 7,
            interval_days: 1,
        }
    }
}

/// Overtime reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertimeConfig {
    /// Comments that count as breaks rather than work.
    pub break_comments: Vec<String>,
    /// Expected working time per weekday, in minutes.
    pub daily_working_minutes: i64,
}

impl Default for OvertimeConfig {
    fn default() -> Self {
        Self {
            break_comments: ["pause", "break", "lunch"].map(String::from).to_vec(),
            daily_working_minutes: 8 * 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("stt.db"),
            date_time_layouts: DEFAULT_LAYOUTS.map(String::from).to_vec(),
            backup: BackupConfig::default(),
            overtime: OvertimeConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // STT_DATABASE_PATH, STT_BACKUP__LOCATION, ...
        figment = figment.merge(Env::prefixed("STT_").split("__"));

        figment.extract()
    }

    /// Parses the configured layouts. An empty list falls back to the defaults.
    pub fn layouts(&self) -> Result<Vec<DateTimeLayout>> {
        if self.date_time_layouts.is_empty() {
            return Ok(DateTimeLayout::defaults());
        }
        self.date_time_layouts
            .iter()
            .map(|layout| {
                layout
                    .parse()
                    .with_context(|| format!("invalid entry in date_time_layouts: {layout:?}"))
            })
            .collect()
    }

    /// The backup rotator, if a backup location is configured.
    pub fn backup_rotator(&self) -> Option<BackupRotator> {
        let location = self.backup.location.as_ref()?;
        Some(
            BackupRotator::new(location, self.backup.retention_count)
                .with_interval_days(self.backup.interval_days),
        )
    }

    pub fn categorizer(&self) -> ItemCategorizer {
        ItemCategorizer::new(self.overtime.break_comments.iter().map(String::as_str))
    }

    pub fn working_time(&self) -> WorkingTime {
        WorkingTime::weekdays(Duration::minutes(self.overtime.daily_working_minutes))
    }
}

/// Returns the platform-specific config directory for stt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stt"))
}

/// Returns the platform-specific data directory for stt.
///
/// On Linux: `~/.local/share/stt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("stt"))
}

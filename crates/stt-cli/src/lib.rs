//! stt command-line library.
//!
//! This crate provides the CLI interface for the stt journal.

mod cli;
pub mod commands;
mod config;
mod tracker;

pub use cli::{Cli, Commands};
pub use config::{BackupConfig, Config, OvertimeConfig};
pub use tracker::Tracker;

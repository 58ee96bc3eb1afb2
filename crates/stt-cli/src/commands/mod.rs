//! CLI subcommand implementations.

pub mod backup;
pub mod days;
pub mod import;
pub mod overtime;
pub mod report;
pub mod status;
pub mod track;

//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Simple time tracking journal.
///
/// Records what you work on from short English commands such as
/// `stt on code review since 9:30` or `stt fin at 17:00`.
#[derive(Debug, Parser)]
#[command(name = "stt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a tracking command, e.g. `stt on writing docs 2 hours ago`.
    On {
        /// Command text: a comment with an optional time expression, `fin`, or `resume last`.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Stop the ongoing item, optionally `at <time>`.
    Fin {
        #[arg(num_args = 0..)]
        text: Vec<String>,
    },

    /// Start a new item with the last item's comment.
    Resume,

    /// Show the ongoing item.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the items of one day.
    Report {
        /// Day to report (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_name = "YYYY-MM-DD")]
        day: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List tracked days with their first item.
    Days,

    /// Show overtime per day.
    Overtime,

    /// Import items from a plain-text journal file.
    Import {
        /// File with one `<start> [<end>] [comment]` item per line.
        file: PathBuf,
    },

    /// Back up the journal now.
    Backup,
}

impl Commands {
    /// Returns the command text for subcommands that are shorthands for tracking commands.
    pub fn command_text(&self) -> Option<String> {
        match self {
            Self::On { text } => Some(text.join(" ")),
            Self::Fin { text } if text.is_empty() => Some("fin".to_string()),
            Self::Fin { text } => Some(format!("fin {}", text.join(" "))),
            Self::Resume => Some("resume last".to_string()),
            _ => None,
        }
    }
}

//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pulse_core::HistoryFilter;

/// Personal work timer.
///
/// Tracks work sessions with a start/stop timer or manual entries, keeps a
/// daily running total and exports sessions as CSV, JSON or text.
#[derive(Debug, Parser)]
#[command(name = "pulse", version, about, long_about = None)]
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
    /// Start the timer.
    Start,

    /// Stop the timer and save the session.
    Stop,

    /// Show timer state and today's totals.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record a session after the fact.
    Add {
        /// Start time (e.g. "09:00", "2025-01-29 09:00", "2 hours ago").
        #[arg(long)]
        start: String,

        /// End time, same formats as --start.
        #[arg(long)]
        end: String,
    },

    /// Change the times of a saved session.
    Edit {
        /// Session ID or unique prefix.
        id: String,

        /// New start time.
        #[arg(long)]
        start: Option<String>,

        /// New end time.
        #[arg(long)]
        end: Option<String>,
    },

    /// Delete a saved session.
    Delete {
        /// Session ID or unique prefix.
        id: String,
    },

    /// End the work day, stopping the timer if it is running.
    EndDay,

    /// Reopen an ended work day.
    ResumeDay,

    /// List saved sessions grouped by day.
    History {
        #[command(flatten)]
        window: HistoryWindow,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a month with active days marked, or the sessions of one day.
    Calendar {
        /// Month to show as YYYY-MM. Defaults to the current month.
        #[arg(long, value_name = "YYYY-MM", conflicts_with = "day")]
        month: Option<String>,

        /// List the sessions of one day (YYYY-MM-DD, "today" or "yesterday").
        #[arg(long)]
        day: Option<String>,
    },

    /// Export sessions as CSV, JSON or text.
    Export {
        /// Export a single day (YYYY-MM-DD, "today" or "yesterday").
        #[arg(long, conflicts_with_all = ["today", "week", "all"])]
        day: Option<String>,

        #[command(flatten)]
        window: HistoryWindow,

        /// Output format.
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Write to this file, or into this directory with a generated name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Live timer display; reads start/stop/end/resume/quit from stdin.
    Watch,
}

/// History window flags. Defaults to today.
#[derive(Debug, Clone, Copy, Args)]
#[group(multiple = false)]
pub struct HistoryWindow {
    /// Only today's sessions.
    #[arg(long)]
    pub today: bool,

    /// The last seven days, including today.
    #[arg(long)]
    pub week: bool,

    /// Every session.
    #[arg(long)]
    pub all: bool,
}

impl HistoryWindow {
    pub const fn filter(self) -> HistoryFilter {
        if self.all {
            HistoryFilter::All
        } else if self.week {
            HistoryFilter::Week
        } else {
            HistoryFilter::Today
        }
    }
}

/// Export output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

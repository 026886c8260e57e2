//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// studyplan - human-in-the-loop curriculum planner
#[derive(Debug, Parser)]
#[command(
    name = "sp",
    about = "Draft, review and refine a day-by-day learning plan with an LLM",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a course interactively, then read its lessons day by day
    Plan {
        /// What to learn
        #[arg(short, long)]
        topic: Option<String>,

        /// Prior experience with the topic (e.g. "4 years")
        #[arg(short, long)]
        experience: Option<String>,

        /// Course length in days
        #[arg(short, long)]
        days: Option<u32>,

        /// Save the approved plan and generated lessons here
        #[arg(short, long, value_name = "DIR")]
        save_dir: Option<PathBuf>,

        /// Print lessons as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Show the log file
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Location of the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    get_log_dir().join("studyplan.log")
}

pub fn get_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyplan")
        .join("logs")
}

//! `rankwatch` command line
//!
//! ## Commands
//!
//! - `rankwatch run [--dry-run]` - one run over every configured app
//! - `rankwatch schedule` - run daily at the configured time until interrupted
//! - `rankwatch history <APP>` - stored ranks for one app, newest first
//! - `rankwatch logs` - run log entries, newest first
//! - `rankwatch targets` - resolved leaderboard URLs for a reference date

pub mod history_cmd;
pub mod logging;
pub mod run_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rankwatch_tracker::TrackerConfig;

pub use history_cmd::{HistoryArgs, LogsArgs, TargetsArgs};
pub use run_cmd::RunArgs;

/// Daily app leaderboard rank tracker
#[derive(Debug, Parser)]
#[command(name = "rankwatch", version, about)]
pub struct Cli {
    /// Config file (default: $RANKWATCH_CONFIG, then ~/.config/rankwatch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape, post and store ranks for every configured app once
    Run(RunArgs),

    /// Run every day at the configured time until interrupted
    Schedule,

    /// Show stored ranks for an app
    History(HistoryArgs),

    /// Show run log entries
    Logs(LogsArgs),

    /// Show the apps and URLs a run would visit
    Targets(TargetsArgs),
}

impl Cli {
    /// Execute the selected command and return the process exit code.
    pub async fn run(self, config: TrackerConfig) -> i32 {
        let result = match self.command {
            Command::Run(args) => run_cmd::run_once(&config, &args).await,
            Command::Schedule => run_cmd::run_schedule(&config).await,
            Command::History(args) => history_cmd::show_history(&config, &args),
            Command::Logs(args) => history_cmd::show_logs(&config, &args),
            Command::Targets(args) => history_cmd::show_targets(&config, &args),
        };

        match result {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {e:#}");
                1
            }
        }
    }
}

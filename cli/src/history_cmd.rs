//! Read-only commands: `history`, `logs` and `targets`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use rankwatch_tracker::{HistoryStore, TrackerConfig, reference_date, tracked_apps};

#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// App name as configured (e.g. "Phantom")
    pub app: String,

    /// Maximum rows to show
    #[arg(long, default_value_t = 14)]
    pub limit: u32,
}

#[derive(Debug, Parser)]
pub struct LogsArgs {
    /// Maximum entries to show
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Debug, Parser)]
pub struct TargetsArgs {
    /// Reference date (YYYY-MM-DD); defaults to yesterday in UTC
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,
}

fn open_store(config: &TrackerConfig) -> Result<HistoryStore> {
    HistoryStore::from_database_url(&config.database_url).context("failed to open history store")
}

fn rank_cell(rank: Option<u32>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.to_string())
}

pub fn show_history(config: &TrackerConfig, args: &HistoryArgs) -> Result<()> {
    let records = open_store(config)?.recent_ranks(&args.app, args.limit)?;
    if records.is_empty() {
        println!("No stored ranks for {}", args.app);
        return Ok(());
    }

    println!("{:<20}  {:>8}  {:>8}  CATEGORY", "DATE (UTC)", "ALL", "SPECIFIC");
    for record in records {
        println!(
            "{:<20}  {:>8}  {:>8}  {}",
            record.date.format("%Y-%m-%d %H:%M:%S"),
            rank_cell(record.all_rank),
            rank_cell(record.specific_rank),
            record.category
        );
    }
    Ok(())
}

pub fn show_logs(config: &TrackerConfig, args: &LogsArgs) -> Result<()> {
    let entries = open_store(config)?.recent_logs(args.limit)?;
    if entries.is_empty() {
        println!("No log entries");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {:<5}  {}",
            entry.created_on.format("%Y-%m-%d %H:%M:%S"),
            entry.kind,
            entry.message
        );
    }
    Ok(())
}

pub fn show_targets(config: &TrackerConfig, args: &TargetsArgs) -> Result<()> {
    let date = match &args.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid --date {raw:?}, expected YYYY-MM-DD"))?
            .format("%Y-%m-%d")
            .to_string(),
        None => reference_date(Utc::now()),
    };

    println!("Reference date: {date}");
    for app in tracked_apps(&config.apps, &date) {
        println!();
        println!("{} {} ({})", app.emoji, app.name, app.category);
        println!("  {}", app.url);
    }
    Ok(())
}

//! `run` and `schedule` commands.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use rankwatch_browser::ChromiumRankSource;
use rankwatch_tracker::{
    HistoryStore, LogOnlyNotifier, Notifier, RunMode, RunReport, SystemClock, Tracker,
    TrackerConfig, TwitterCredentials, TwitterNotifier,
};

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Scrape and print the messages without posting or storing ranks
    #[arg(long)]
    pub dry_run: bool,
}

/// One run over every configured app; prints what was posted.
pub async fn run_once(config: &TrackerConfig, args: &RunArgs) -> Result<()> {
    let credentials = if args.dry_run {
        None
    } else {
        Some(TwitterCredentials::from_env()?)
    };
    let report = execute(config, credentials.as_ref()).await?;
    let mode = if credentials.is_some() {
        RunMode::Live
    } else {
        RunMode::DryRun
    };
    print_report(&report, mode);
    Ok(())
}

/// A live run when `credentials` are given, a dry run otherwise.
async fn execute(
    config: &TrackerConfig,
    credentials: Option<&TwitterCredentials>,
) -> Result<RunReport> {
    let store = HistoryStore::from_database_url(&config.database_url)
        .context("failed to open history store")?;
    let (mode, notifier): (RunMode, Box<dyn Notifier>) = match credentials {
        Some(credentials) => (
            RunMode::Live,
            Box::new(TwitterNotifier::with_api_base(
                credentials.clone(),
                config.notifier.api_base.as_str(),
            )),
        ),
        None => (RunMode::DryRun, Box::new(LogOnlyNotifier)),
    };
    let tracker = Tracker::new(
        config.clone(),
        store,
        ChromiumRankSource::new(config.scrape.clone()),
        notifier,
        Box::new(SystemClock),
    );
    Ok(tracker.run(mode).await?)
}

fn print_report(report: &RunReport, mode: RunMode) {
    println!("Reference date: {}", report.reference_date);
    for outcome in &report.outcomes {
        println!();
        match (mode, outcome.post_id.as_deref()) {
            (RunMode::DryRun, _) => println!("[dry run] {}", outcome.app),
            (RunMode::Live, Some(id)) => println!("[posted {id}] {}", outcome.app),
            (RunMode::Live, None) => println!("[posted] {}", outcome.app),
        }
        println!("{}", outcome.message);
    }
}

/// Run at the configured time every day. A failed run is logged and the
/// loop waits for the next tick; Ctrl-C stops the loop. Credentials are
/// checked once, before the first wait.
pub async fn run_schedule(config: &TrackerConfig) -> Result<()> {
    let credentials = TwitterCredentials::from_env()?;
    HistoryStore::from_database_url(&config.database_url)
        .context("failed to open history store")?;
    tracing::info!(
        hour = config.schedule.hour,
        minute = config.schedule.minute,
        "Scheduler started"
    );

    loop {
        let now = Local::now();
        let next = config
            .schedule
            .next_after(&now)
            .context("could not compute the next scheduled run")?;
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %next.to_rfc3339(), "Waiting for next run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, scheduler stopping");
                return Ok(());
            }
        }

        match execute(config, Some(&credentials)).await {
            Ok(report) => {
                tracing::info!(apps = report.outcomes.len(), "Scheduled run succeeded");
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Scheduled run failed");
            }
        }
    }
}

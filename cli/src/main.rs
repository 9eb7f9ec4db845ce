//! `rankwatch` entry point.

use clap::Parser;
use rankwatch_cli::{Cli, logging};
use rankwatch_tracker::TrackerConfig;

#[tokio::main]
async fn main() {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match TrackerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let log_dir = config.resolved_log_dir();
    let log_guard = logging::init(log_dir.as_deref());
    tracing::debug!(version = rankwatch_tracker::VERSION, "rankwatch starting");

    let code = cli.run(config).await;
    // exit() skips destructors; flush the file writer first.
    drop(log_guard);
    std::process::exit(code);
}

#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `rankwatch` binary tests
//!
//! Each test gets its own config file and database under a temp dir, and
//! runs the binary from there so no stray `.env` is picked up.
//!
//! ## Exit Codes
//! - 0: success
//! - 1: command failed
//! - 2: configuration could not be loaded

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use rankwatch_tracker::HistoryStore;
use rankwatch_tracker::store::NewRankRecord;
use tempfile::TempDir;

const CONFIG: &str = r#"
[[apps]]
name = "Demo"
url_template = "https://leaderboard.test/rankings?date={date}&app=1"
category = "Games"
emoji = "🎮"
"#;

fn rankwatch(home: &Path) -> Result<assert_cmd::Command> {
    let config_path = home.join("config.toml");
    if !config_path.exists() {
        fs::write(&config_path, CONFIG)?;
    }
    let mut cmd = assert_cmd::Command::cargo_bin("rankwatch")?;
    cmd.current_dir(home)
        .env("DATABASE_URL", home.join("ranks.db"))
        .env_remove("RANKWATCH_CONFIG")
        .env_remove("TWITTER_CONSUMER_KEY")
        .env_remove("TWITTER_CONSUMER_SECRET")
        .env_remove("TWITTER_ACCESS_TOKEN")
        .env_remove("TWITTER_ACCESS_SECRET")
        .arg("--config")
        .arg(&config_path);
    Ok(cmd)
}

#[test]
fn targets_substitutes_reference_date() -> Result<()> {
    let home = TempDir::new()?;
    rankwatch(home.path())?
        .args(["targets", "--date", "2024-03-09"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference date: 2024-03-09"))
        .stdout(predicate::str::contains("🎮 Demo (Games)"))
        .stdout(predicate::str::contains(
            "https://leaderboard.test/rankings?date=2024-03-09&app=1",
        ));
    Ok(())
}

#[test]
fn history_lists_newest_first() -> Result<()> {
    let home = TempDir::new()?;
    let store = HistoryStore::open(&home.path().join("ranks.db"))?;
    for (day, all_rank) in [(8, 30), (9, 25)] {
        store.insert_rank_record(&NewRankRecord {
            app: "Demo".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap(),
            category: "Games".to_string(),
            all_rank,
            specific_rank: 3,
        })?;
    }
    drop(store);

    let output = rankwatch(home.path())?
        .args(["history", "Demo"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    let newer = stdout.find("2024-03-09 08:00:00").expect("newer row");
    let older = stdout.find("2024-03-08 08:00:00").expect("older row");
    assert!(newer < older, "rows out of order:\n{stdout}");
    Ok(())
}

#[test]
fn logs_on_fresh_database_is_empty() -> Result<()> {
    let home = TempDir::new()?;
    rankwatch(home.path())?
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("No log entries"));
    Ok(())
}

#[test]
fn live_run_without_credentials_fails() -> Result<()> {
    let home = TempDir::new()?;
    rankwatch(home.path())?
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "missing posting credential TWITTER_CONSUMER_KEY",
        ));
    Ok(())
}

#[test]
fn schedule_without_credentials_fails_before_waiting() -> Result<()> {
    let home = TempDir::new()?;
    rankwatch(home.path())?
        .arg("schedule")
        .timeout(Duration::from_secs(30))
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "missing posting credential TWITTER_CONSUMER_KEY",
        ));
    Ok(())
}

#[test]
fn invalid_config_exits_with_code_two() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(home.path().join("config.toml"), "apps = []")?;
    rankwatch(home.path())?
        .arg("logs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no apps configured"));
    Ok(())
}

#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end runs over a file-backed store.
//!
//! The leaderboard is replaced by canned tables and the posting API by a
//! local mock server; everything else is the production code path:
//!   1. Seed the previous day's ranks
//!   2. Run the tracker
//!   3. Check the exact post body, the stored rows and the log table

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rankwatch_tracker::store::NewRankRecord;
use rankwatch_tracker::{
    ErrorCategory, HistoryStore, ManualClock, RankSource, RunMode, ScrapeResult, TableRow,
    Tracker, TrackedApp, TrackerConfig, TwitterCredentials, TwitterNotifier, extract_ranks,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Leaderboard stand-in: rows per app name. Apps without rows fail like a
/// page that never rendered.
struct CannedTables {
    rows: HashMap<String, Vec<TableRow>>,
}

impl CannedTables {
    fn new(entries: Vec<(&str, Vec<TableRow>)>) -> Self {
        Self {
            rows: entries
                .into_iter()
                .map(|(app, rows)| (app.to_string(), rows))
                .collect(),
        }
    }
}

#[async_trait]
impl RankSource for CannedTables {
    async fn fetch_ranks(&self, app: &TrackedApp) -> rankwatch_tracker::Result<ScrapeResult> {
        match self.rows.get(&app.name) {
            Some(rows) => Ok(extract_ranks(rows.clone(), &app.category)),
            None => Err(rankwatch_tracker::TrackerError::scrape_timeout(
                &app.name,
                std::time::Duration::from_secs(30),
            )),
        }
    }
}

fn credentials() -> TwitterCredentials {
    TwitterCredentials {
        consumer_key: "ck".to_string(),
        consumer_secret: "cs".to_string(),
        access_token: "at".to_string(),
        access_secret: "as".to_string(),
    }
}

fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
}

fn clock() -> Box<ManualClock> {
    let utc = FixedOffset::east_opt(0).unwrap();
    Box::new(ManualClock::new(run_time()).with_offset(utc))
}

fn seed(store_path: &Path, app: &str, category: &str, all_rank: u32, specific_rank: u32) {
    let store = HistoryStore::open(store_path).unwrap();
    store
        .insert_rank_record(&NewRankRecord {
            app: app.to_string(),
            date: run_time() - chrono::Duration::days(1),
            category: category.to_string(),
            all_rank,
            specific_rank,
        })
        .unwrap();
}

fn phantom_table() -> Vec<TableRow> {
    vec![
        TableRow::new("Apps", "12"),
        TableRow::new("Games", "50"),
        TableRow::new("Utilities", "4"),
    ]
}

async fn accept_posts(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "data": { "id": "42" } })),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn phantom_run_posts_trend_and_appends_history() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rankwatch.db");
    seed(&db_path, "Phantom", "Utilities", 15, 4);

    let server = MockServer::start().await;
    let expected_post = "👻 Phantom App Rank\n\
                         📅 10 Mar 8AM\n\
                         \n\
                         🌎 All apps\n\
                         📈 12 (+3)\n\
                         \n\
                         🏦 Utilities\n\
                         📊 4 (+0)";
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(body_json(serde_json::json!({ "text": expected_post })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "data": { "id": "42" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = TrackerConfig {
        apps: rankwatch_tracker::targets::default_catalog()
            .into_iter()
            .take(1)
            .collect(),
        ..TrackerConfig::default()
    };
    let tracker = Tracker::new(
        config,
        HistoryStore::open(&db_path).unwrap(),
        CannedTables::new(vec![("Phantom", phantom_table())]),
        TwitterNotifier::with_api_base(credentials(), server.uri()),
        clock(),
    );

    let report = tracker.run(RunMode::Live).await.expect("run");
    assert_eq!(report.reference_date, "2024-03-09");
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].post_id.as_deref(), Some("42"));
    drop(tracker);

    let store = HistoryStore::open(&db_path).unwrap();
    assert_eq!(store.rank_count().unwrap(), 2);
    let latest = store.most_recent_rank("Phantom").unwrap().expect("row");
    assert_eq!(latest.date, run_time());
    assert_eq!(latest.category, "Utilities");
    assert_eq!((latest.all_rank, latest.specific_rank), (Some(12), Some(4)));

    let logs = store.recent_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].kind, "log");
    assert_eq!(logs[0].message, "Started");
}

#[tokio::test]
async fn failure_on_second_app_keeps_first_app_record() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rankwatch.db");
    seed(&db_path, "Phantom", "Utilities", 15, 4);
    seed(&db_path, "Coinbase Wallet", "Finance", 300, 9);

    let server = MockServer::start().await;
    accept_posts(&server, 1).await;

    let tracker = Tracker::new(
        TrackerConfig::default(),
        HistoryStore::open(&db_path).unwrap(),
        CannedTables::new(vec![("Phantom", phantom_table())]),
        TwitterNotifier::with_api_base(credentials(), server.uri()),
        clock(),
    );

    let err = tracker.run(RunMode::Live).await.expect_err("second app");
    assert_eq!(err.category(), ErrorCategory::ScrapeTimeout);
    drop(tracker);

    let store = HistoryStore::open(&db_path).unwrap();
    assert_eq!(store.rank_count().unwrap(), 3);
    assert_eq!(store.recent_ranks("Coinbase Wallet", 10).unwrap().len(), 1);

    let logs = store.recent_logs(10).unwrap();
    let errors: Vec<_> = logs.iter().filter(|l| l.kind == "error").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "ranking table for Coinbase Wallet did not appear within 30s"
    );
}

#[tokio::test]
async fn non_numeric_rank_stops_before_posting() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rankwatch.db");
    seed(&db_path, "Phantom", "Utilities", 15, 4);

    let server = MockServer::start().await;
    accept_posts(&server, 0).await;

    let tracker = Tracker::new(
        TrackerConfig::default(),
        HistoryStore::open(&db_path).unwrap(),
        CannedTables::new(vec![(
            "Phantom",
            vec![TableRow::new("Apps", "12"), TableRow::new("Utilities", "N/A")],
        )]),
        TwitterNotifier::with_api_base(credentials(), server.uri()),
        clock(),
    );

    let err = tracker.run(RunMode::Live).await.expect_err("validation");
    assert_eq!(err.category(), ErrorCategory::ValidationError);
    assert!(
        err.to_string()
            .starts_with("retrieved invalid app rankings for Phantom")
    );
    assert_eq!(tracker.store().rank_count().unwrap(), 1);
}

#[tokio::test]
async fn rejected_post_leaves_history_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rankwatch.db");
    seed(&db_path, "Phantom", "Utilities", 15, 4);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let tracker = Tracker::new(
        TrackerConfig::default(),
        HistoryStore::open(&db_path).unwrap(),
        CannedTables::new(vec![("Phantom", phantom_table())]),
        TwitterNotifier::with_api_base(credentials(), server.uri()),
        clock(),
    );

    let err = tracker.run(RunMode::Live).await.expect_err("notify");
    assert_eq!(err.category(), ErrorCategory::NotifyError);
    assert_eq!(tracker.store().rank_count().unwrap(), 1);
    assert_eq!(tracker.store().recent_logs(1).unwrap()[0].kind, "error");
}

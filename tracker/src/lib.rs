//! Daily app leaderboard rank tracker
//!
//! Each run visits the configured apps one at a time:
//! - looks up the last stored ranks for the app
//! - reads today's overall and category ranks from the leaderboard
//! - composes a trend message and posts it
//! - appends the new ranks to the history store
//!
//! The browser that renders the leaderboard lives in `rankwatch-browser`
//! behind the [`RankSource`] trait; this crate has no browser dependency.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod clock;
pub mod config;
pub mod errors;
pub mod notifier;
pub mod orchestrator;
pub mod ranks;
pub mod schedule;
pub mod store;
pub mod targets;
pub mod trend;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{NotifierConfig, ScrapeConfig, TrackerConfig};
pub use errors::{ErrorCategory, Result, TrackerError};
pub use notifier::{LogOnlyNotifier, Notifier, PostReceipt, TwitterCredentials, TwitterNotifier};
pub use orchestrator::{AppOutcome, RunMode, RunReport, Tracker};
pub use ranks::{RankPair, RankSource, ScrapeResult, TableRow, extract_ranks};
pub use schedule::Schedule;
pub use store::{HistoryStore, LogEntry, LogKind, RankRecord};
pub use targets::{AppTarget, TrackedApp, reference_date, tracked_apps};
pub use trend::{MessageInput, MessageStamp, Trend, compose_message};

/// Tracker version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! One run across all tracked apps.
//!
//! Per app, in order: fetch previous rank → scrape → validate → format →
//! notify → persist. The first failure ends the whole run; it is recorded
//! once as an error log entry and handed back to the caller. Rows already
//! written for earlier apps stay.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::errors::{Result, TrackerError};
use crate::notifier::Notifier;
use crate::ranks::{RankPair, RankSource};
use crate::store::{HistoryStore, NewLogEntry, NewRankRecord, RankRecord};
use crate::targets::{TrackedApp, reference_date, tracked_apps};
use crate::trend::{MessageInput, MessageStamp, compose_message};

/// Message written to `logs` when a run begins.
pub const RUN_STARTED_MESSAGE: &str = "Started";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Post and persist.
    #[default]
    Live,
    /// Scrape and format only; nothing is posted and no rank is stored.
    DryRun,
}

/// What happened for one app in a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOutcome {
    pub app: String,
    pub ranks: RankPair,
    pub message: String,
    /// Row id of the stored record; `None` in dry runs
    pub record_id: Option<i64>,
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reference_date: String,
    pub outcomes: Vec<AppOutcome>,
}

/// Sequences the registry, extractor, formatter, notifier and store.
pub struct Tracker<S, N> {
    config: TrackerConfig,
    store: HistoryStore,
    source: S,
    notifier: N,
    clock: Box<dyn Clock>,
}

impl<S, N> Tracker<S, N>
where
    S: RankSource,
    N: Notifier,
{
    pub fn new(
        config: TrackerConfig,
        store: HistoryStore,
        source: S,
        notifier: N,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            source,
            notifier,
            clock,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Execute one run. Errors are logged to the store before being returned.
    pub async fn run(&self, mode: RunMode) -> Result<RunReport> {
        match self.run_inner(mode).await {
            Ok(report) => {
                tracing::info!(
                    apps = report.outcomes.len(),
                    reference_date = %report.reference_date,
                    "Run finished"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!(
                    category = err.category().as_str(),
                    error = %err,
                    "Run aborted"
                );
                let entry = NewLogEntry::error(err.to_string(), self.clock.now());
                if let Err(log_err) = self.store.insert_log_entry(&entry) {
                    tracing::warn!(error = %log_err, "Failed to record run error");
                }
                Err(err)
            }
        }
    }

    async fn run_inner(&self, mode: RunMode) -> Result<RunReport> {
        self.store
            .insert_log_entry(&NewLogEntry::info(RUN_STARTED_MESSAGE, self.clock.now()))?;

        let reference_date = reference_date(self.clock.now());
        let apps = tracked_apps(&self.config.apps, &reference_date);
        tracing::info!(
            apps = apps.len(),
            reference_date = %reference_date,
            dry_run = mode == RunMode::DryRun,
            "Run started"
        );

        let mut outcomes = Vec::with_capacity(apps.len());
        for app in &apps {
            outcomes.push(self.process_app(app, mode).await?);
        }

        Ok(RunReport {
            reference_date,
            outcomes,
        })
    }

    async fn process_app(&self, app: &TrackedApp, mode: RunMode) -> Result<AppOutcome> {
        let previous = self.previous_rank(app)?;

        let scraped = self.source.fetch_ranks(app).await?;
        let ranks = scraped.validate(&app.name)?;
        tracing::info!(
            app = %app.name,
            overall = ranks.overall,
            category = ranks.category,
            "Ranks scraped"
        );

        let message = compose_message(&MessageInput {
            app_name: &app.name,
            category: &app.category,
            emoji: &app.emoji,
            overall: ranks.overall,
            category_rank: ranks.category,
            previous_overall: previous.as_ref().and_then(|p| p.all_rank),
            previous_category: previous.as_ref().and_then(|p| p.specific_rank),
            stamp: MessageStamp::at(&self.clock.local_now()),
        });

        if mode == RunMode::DryRun {
            return Ok(AppOutcome {
                app: app.name.clone(),
                ranks,
                message,
                record_id: None,
                post_id: None,
            });
        }

        let receipt = self.notifier.publish(&message).await?;

        let record_id = self.store.insert_rank_record(&NewRankRecord {
            app: app.name.clone(),
            date: self.clock.now(),
            category: app.category.clone(),
            all_rank: ranks.overall,
            specific_rank: ranks.category,
        })?;

        Ok(AppOutcome {
            app: app.name.clone(),
            ranks,
            message,
            record_id: Some(record_id),
            post_id: receipt.id,
        })
    }

    fn previous_rank(&self, app: &TrackedApp) -> Result<Option<RankRecord>> {
        match self.store.most_recent_rank(&app.name)? {
            Some(record) => Ok(Some(record)),
            None if self.config.allow_first_observation => {
                tracing::info!(app = %app.name, "No stored rank yet; posting without trend");
                Ok(None)
            }
            None => Err(TrackerError::lookup(&app.name)),
        }
    }
}

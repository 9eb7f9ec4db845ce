//! Tracker configuration loading
//!
//! Loads configuration from `~/.config/rankwatch/config.toml` (or the file
//! named by `RANKWATCH_CONFIG`). A missing file means defaults. Secrets are
//! not part of the file: the database URL may be overridden by
//! `DATABASE_URL` and posting credentials always come from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{Result, TrackerError};
use crate::notifier::DEFAULT_API_BASE;
use crate::ranks::GENERIC_CATEGORY;
use crate::schedule::Schedule;
use crate::targets::{AppTarget, default_catalog};

/// Root configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Database connection string: a SQLite path or `sqlite://` URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Continue with no trend lines when an app has no stored rank yet.
    /// Off by default: a missing previous rank fails the run.
    #[serde(default)]
    pub allow_first_observation: bool,

    /// Directory for daily-rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Browser scrape settings
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Daily trigger time
    #[serde(default)]
    pub schedule: Schedule,

    /// Posting API settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Apps to track; replaces the built-in catalog when present
    #[serde(default = "default_catalog")]
    pub apps: Vec<AppTarget>,
}

fn default_database_url() -> String {
    dirs::data_dir()
        .map(|d| {
            d.join("rankwatch")
                .join("rankwatch.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "rankwatch.db".to_string())
}

/// Headless browser settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    /// CSS selector of the ranking table body
    #[serde(default = "default_table_selector")]
    pub table_selector: String,

    /// Bounded wait for the table to appear, in seconds
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// How often to look for the table while waiting, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Column holding the category name (0-based)
    #[serde(default = "default_category_column")]
    pub category_column: usize,

    /// Column holding the rank (0-based)
    #[serde(default = "default_rank_column")]
    pub rank_column: usize,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Chrome/Chromium binary; auto-detected when unset
    #[serde(default)]
    pub chrome_executable: Option<String>,

    /// Pass `--no-sandbox` (needed in most containers)
    #[serde(default)]
    pub no_sandbox: bool,
}

fn default_table_selector() -> String {
    "#category-ranking-table tbody".to_string()
}

fn default_wait_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_category_column() -> usize {
    3
}

fn default_rank_column() -> usize {
    4
}

fn default_viewport_width() -> u32 {
    1080
}

fn default_viewport_height() -> u32 {
    1024
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            table_selector: default_table_selector(),
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            category_column: default_category_column(),
            rank_column: default_rank_column(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            chrome_executable: None,
            no_sandbox: false,
        }
    }
}

impl ScrapeConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Posting API settings
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            allow_first_observation: false,
            log_dir: None,
            scrape: ScrapeConfig::default(),
            schedule: Schedule::default(),
            notifier: NotifierConfig::default(),
            apps: default_catalog(),
        }
    }
}

impl TrackerConfig {
    /// Environment variable naming the config file
    pub const ENV_CONFIG_PATH: &'static str = "RANKWATCH_CONFIG";

    /// Environment variable overriding `database_url`
    pub const ENV_DATABASE_URL: &'static str = "DATABASE_URL";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Load from `explicit` if given, else from the resolved default path,
    /// then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::resolve_config_path();
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    tracing::debug!(
                        path = %path.display(),
                        "Config not found, using defaults"
                    );
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides(|name| std::env::var(name).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: TrackerConfig = toml::from_str(contents)
            .map_err(|e| TrackerError::config_with_source("failed to parse config", e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `DATABASE_URL` through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(Self::ENV_DATABASE_URL).filter(|v| !v.trim().is_empty()) {
            self.database_url = url;
        }
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|d| d.join("rankwatch").join(Self::DEFAULT_CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<()> {
        if self.apps.is_empty() {
            return Err(TrackerError::config("no apps configured"));
        }
        for app in &self.apps {
            if app.name.trim().is_empty() {
                return Err(TrackerError::config("app entry with empty name"));
            }
            if app.category.trim().is_empty() {
                return Err(TrackerError::config(format!(
                    "app {} has an empty category",
                    app.name
                )));
            }
            if app.category.trim() == GENERIC_CATEGORY {
                return Err(TrackerError::config(format!(
                    "app {} uses the overall leaderboard category {GENERIC_CATEGORY:?} as its own category",
                    app.name
                )));
            }
            if !app.url_template.contains(crate::targets::DATE_PLACEHOLDER) {
                tracing::warn!(
                    app = %app.name,
                    "url_template has no {{date}} placeholder; every run will query the same day"
                );
            }
        }
        if self.scrape.category_column == self.scrape.rank_column {
            return Err(TrackerError::config(
                "scrape.category_column and scrape.rank_column must differ",
            ));
        }
        if self.scrape.wait_timeout_secs == 0 {
            return Err(TrackerError::config("scrape.wait_timeout_secs must be > 0"));
        }
        self.schedule.validate()?;
        Ok(())
    }

    /// Resolved log directory (expanding `~/`)
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        let dir = self.log_dir.as_deref()?;
        if let Some(stripped) = dir.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return Some(home.join(stripped));
        }
        Some(PathBuf::from(dir))
    }
}

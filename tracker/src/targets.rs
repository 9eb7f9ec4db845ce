//! Apps to track on each run.
//!
//! The catalog is configuration: each entry carries a URL template with a
//! `{date}` placeholder that is filled with the run's reference date.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Placeholder substituted with the reference date in `url_template`.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// A catalog entry, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppTarget {
    pub name: String,
    pub url_template: String,
    pub category: String,
    pub emoji: String,
}

/// An app resolved for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedApp {
    pub name: String,
    pub url: String,
    pub category: String,
    pub emoji: String,
}

impl AppTarget {
    pub fn resolve(&self, reference_date: &str) -> TrackedApp {
        TrackedApp {
            name: self.name.clone(),
            url: self.url_template.replace(DATE_PLACEHOLDER, reference_date),
            category: self.category.clone(),
            emoji: self.emoji.clone(),
        }
    }
}

/// Built-in catalog: Phantom and Coinbase Wallet on the US iPhone free charts.
pub fn default_catalog() -> Vec<AppTarget> {
    vec![
        AppTarget {
            name: "Phantom".to_string(),
            url_template: "https://app.sensortower.com/category-rankings?os=ios&app_id=1598432977\
                &start_date={date}&end_date={date}&countries=US&category=6015&category=36\
                &category=0&category=6002&chart_type=free&device=iphone&hourly=false\
                &selected_tab=charts&date={date}&summary_chart_type=topfreeapplications"
                .to_string(),
            category: "Utilities".to_string(),
            emoji: "👻".to_string(),
        },
        AppTarget {
            name: "Coinbase Wallet".to_string(),
            url_template: "https://app.sensortower.com/category-rankings?os=ios&app_id=1278383455\
                &start_date={date}&end_date={date}&countries=US&category=6015&category=0\
                &category=36&chart_type=free&chart_type=paid&device=iphone&hourly=false\
                &selected_tab=charts&date={date}&summary_chart_type=topfreeapplications"
                .to_string(),
            category: "Finance".to_string(),
            emoji: "🪙".to_string(),
        },
    ]
}

/// Resolve every catalog entry for `reference_date`, preserving order.
pub fn tracked_apps(catalog: &[AppTarget], reference_date: &str) -> Vec<TrackedApp> {
    catalog
        .iter()
        .map(|target| target.resolve(reference_date))
        .collect()
}

/// The leaderboard date a run queries: yesterday, as a UTC calendar date.
pub fn reference_date(now: DateTime<Utc>) -> String {
    (now - Duration::days(1)).format("%Y-%m-%d").to_string()
}

//! Rank extraction from a rendered leaderboard table.
//!
//! The browser side only reads `(category, rank)` cell text per row; the
//! filtering and validation rules live here so they can be tested without
//! a browser.

use async_trait::async_trait;

use crate::errors::{Result, TrackerError};
use crate::targets::TrackedApp;

/// Category token of the global leaderboard row.
pub const GENERIC_CATEGORY: &str = "Apps";

/// Cell text of one leaderboard row. Either cell may be missing when the
/// row is shorter than expected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub category: Option<String>,
    pub rank: Option<String>,
}

impl TableRow {
    pub fn new(category: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            rank: Some(rank.into()),
        }
    }
}

/// Raw rank cells picked out of the table, before numeric validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    pub overall: Option<String>,
    pub category: Option<String>,
}

/// Validated ranks for one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPair {
    pub overall: u32,
    pub category: u32,
}

/// Keep only the generic and app-specific rows. When a token appears more
/// than once the last row wins.
pub fn extract_ranks<I>(rows: I, specific_category: &str) -> ScrapeResult
where
    I: IntoIterator<Item = TableRow>,
{
    let mut result = ScrapeResult::default();
    for row in rows {
        let Some(category) = row.category.as_deref().map(str::trim) else {
            continue;
        };
        if category == GENERIC_CATEGORY {
            result.overall = row.rank;
        } else if category == specific_category {
            result.category = row.rank;
        }
    }
    result
}

/// Parse a rank cell. Anything other than a positive integer is NaN.
fn parse_rank(cell: Option<&str>) -> Option<u32> {
    cell.map(str::trim)
        .and_then(|text| text.parse::<u32>().ok())
        .filter(|rank| *rank > 0)
}

impl ScrapeResult {
    pub fn validate(&self, app: &str) -> Result<RankPair> {
        let overall = parse_rank(self.overall.as_deref());
        let category = parse_rank(self.category.as_deref());
        match (overall, category) {
            (Some(overall), Some(category)) => Ok(RankPair { overall, category }),
            _ => Err(TrackerError::validation(
                app,
                format!(
                    "overall={}, category={}",
                    describe(self.overall.as_deref()),
                    describe(self.category.as_deref())
                ),
            )),
        }
    }
}

fn describe(cell: Option<&str>) -> String {
    match cell {
        Some(text) => format!("{:?}", text.trim()),
        None => "missing".to_string(),
    }
}

/// Where rank cells come from. The production source drives a headless
/// browser; tests substitute canned tables.
#[async_trait]
pub trait RankSource: Send + Sync {
    /// Load the app's leaderboard page and pick out its rank cells.
    async fn fetch_ranks(&self, app: &TrackedApp) -> Result<ScrapeResult>;
}

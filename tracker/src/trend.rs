//! Status message composition.
//!
//! Trend deltas use the leaderboard's sign convention as posted since the
//! first run: moving up the chart (a smaller rank number) shows `+n`,
//! moving down shows `-n`. Existing followers read the posts that way, so
//! the convention is kept.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Direction of movement between two observations of the same rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Flat,
    Declining,
    Improving,
}

impl Direction {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Flat => "📊",
            Self::Declining => "📉",
            Self::Improving => "📈",
        }
    }
}

/// Rank movement between the previous and the new observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: Direction,
    pub rank: u32,
    /// Absolute difference between the two ranks
    pub delta: u32,
}

impl Trend {
    /// `None` when there is no previous value to compare against.
    pub fn between(previous: Option<u32>, new: u32) -> Option<Self> {
        let previous = previous?;
        let (direction, delta) = if previous == new {
            (Direction::Flat, 0)
        } else if previous < new {
            (Direction::Declining, new - previous)
        } else {
            (Direction::Improving, previous - new)
        };
        Some(Self {
            direction,
            rank: new,
            delta,
        })
    }

    /// Signed delta text: `+0`, `-n` or `+n`.
    pub fn delta_text(&self) -> String {
        match self.direction {
            Direction::Flat => "+0".to_string(),
            Direction::Declining => format!("-{}", self.delta),
            Direction::Improving => format!("+{}", self.delta),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.direction.glyph(),
            self.rank,
            self.delta_text()
        )
    }
}

/// Month abbreviations as rendered for the en-AU locale.
const AU_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

/// Date line inputs: wall-clock day and month, UTC half-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageStamp {
    pub day: u32,
    /// 1-based month
    pub month: u32,
    pub pm: bool,
}

impl MessageStamp {
    /// Day and month from `instant`'s own time zone, half-day from its UTC hour.
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self {
            day: instant.day(),
            month: instant.month(),
            pm: instant.with_timezone(&Utc).hour() >= 12,
        }
    }

    pub fn month_abbrev(&self) -> &'static str {
        let idx = self.month.clamp(1, 12) as usize - 1;
        AU_MONTHS[idx]
    }

    pub fn half_day(&self) -> &'static str {
        if self.pm { "PM" } else { "AM" }
    }
}

impl fmt::Display for MessageStamp {
    // The clock hour is always printed as 8, the time of the daily post.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 8{}",
            self.day,
            self.month_abbrev(),
            self.half_day()
        )
    }
}

/// Everything the message needs for one app.
#[derive(Debug, Clone)]
pub struct MessageInput<'a> {
    pub app_name: &'a str,
    pub category: &'a str,
    pub emoji: &'a str,
    pub overall: u32,
    pub category_rank: u32,
    pub previous_overall: Option<u32>,
    pub previous_category: Option<u32>,
    pub stamp: MessageStamp,
}

/// Render the multi-line status post.
pub fn compose_message(input: &MessageInput<'_>) -> String {
    let mut lines = vec![
        format!("{} {} App Rank", input.emoji, input.app_name),
        format!("📅 {}", input.stamp),
        String::new(),
        "🌎 All apps".to_string(),
    ];
    if let Some(trend) = Trend::between(input.previous_overall, input.overall) {
        lines.push(trend.to_string());
    }
    lines.push(String::new());
    lines.push(format!("🏦 {}", input.category));
    if let Some(trend) = Trend::between(input.previous_category, input.category_rank) {
        lines.push(trend.to_string());
    }
    lines.join("\n")
}

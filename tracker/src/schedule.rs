//! Daily trigger time.
//!
//! Runs are started once a day at a fixed wall-clock time (08:00 by
//! default). This module only computes tick times; the CLI owns the sleep
//! loop.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use serde::Deserialize;

use crate::errors::{Result, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Schedule {
    #[serde(default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

fn default_hour() -> u32 {
    8
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 || self.minute > 59 {
            return Err(TrackerError::config(format!(
                "schedule {:02}:{:02} is not a valid time of day",
                self.hour, self.minute
            )));
        }
        Ok(())
    }

    fn time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }

    /// Next tick strictly after `now`, in `now`'s time zone. Days where the
    /// tick falls into a DST gap are skipped.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let time = self.time_of_day()?;
        let tz = now.timezone();
        let today = now.date_naive();
        (0..=2).find_map(|offset| {
            let date = today.checked_add_signed(Duration::days(offset))?;
            let candidate = tz.from_local_datetime(&date.and_time(time)).earliest()?;
            (candidate > *now).then_some(candidate)
        })
    }
}

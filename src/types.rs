use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::schedule::interval::{format_range, TimeOfDay};

/// A range during which the calendar owner is already committed.
///
/// Supplied by a calendar source sorted by start; not required to be
/// non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Complement of the busy set within the horizon. `start < end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeInterval {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Free time on a single local calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBlock {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl FreeBlock {
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn duration_minutes(&self) -> i64 {
        self.start.minutes_until(self.end)
    }

    /// `HH:MM - HH:MM`
    pub fn label(&self) -> String {
        format_range(self.start, self.end)
    }
}

/// Hour-of-day window a slot has to fall in. Same-day only: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl HourWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::Validation(format!(
                "hour window {} - {} must start before it ends (windows crossing midnight are not supported)",
                start, end
            )));
        }
        Ok(Self { start, end })
    }
}

/// Weekdays, hour window and minimum slot length a query cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsideredRange {
    pub days: HashSet<Weekday>,
    pub hour_window: HourWindow,
    pub min_meeting_minutes: u32,
}

impl ConsideredRange {
    pub fn includes_day(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }
}

/// Formatted slots of one calendar date, labelled with its weekday.
///
/// The date is kept alongside the label so two entries sharing a weekday
/// name stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: String,
    pub date: NaiveDate,
    pub blocks: Vec<String>,
}

/// Per-date slots in chronological order starting from today.
pub type WeeklySchedule = Vec<DaySchedule>;

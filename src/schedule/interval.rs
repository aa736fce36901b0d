//! Time-of-day values, `HH:MM - HH:MM` ranges and local-day splitting.
//!
//! Everything downstream of the free-time sweep works on wall-clock minutes
//! in the configured zone, so comparisons never depend on which calendar date
//! a time was taken from.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::types::{FreeBlock, FreeInterval};

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("expected HH:MM, got {0:?}")]
    Format(String),
    #[error("time of day out of range: {0:?}")]
    OutOfRange(String),
    #[error("expected \"HH:MM - HH:MM\", got {0:?}")]
    Range(String),
}

/// Wall-clock time without a date, `00:00..=24:00`.
///
/// `24:00` is only meaningful as an exclusive end bound: the end of an hour
/// window like `8,24` or the end of a free block cut at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };
    pub const END_OF_DAY: TimeOfDay = TimeOfDay {
        minutes: MINUTES_PER_DAY,
    };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour == 24 && minute == 0 {
            return Some(Self::END_OF_DAY);
        }
        if hour < 24 && minute < 60 {
            Some(Self {
                minutes: (hour * 60 + minute) as u16,
            })
        } else {
            None
        }
    }

    pub fn from_hour(hour: u32) -> Option<Self> {
        Self::new(hour, 0)
    }

    /// Seconds and below are dropped, matching the `HH:MM` rendering.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes % 60)
    }

    /// Signed minutes from `self` to `later`.
    pub fn minutes_until(self, later: TimeOfDay) -> i64 {
        i64::from(later.minutes) - i64::from(self.minutes)
    }

    /// Anchor this time on a calendar date. `24:00` lands on the next day's midnight.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(self.minutes))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    /// Accepts `H:MM` and `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (hours, minutes) = trimmed
            .split_once(':')
            .ok_or_else(|| TimeParseError::Format(s.to_string()))?;

        let well_formed = (1..=2).contains(&hours.len())
            && minutes.len() == 2
            && hours.bytes().all(|b| b.is_ascii_digit())
            && minutes.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(TimeParseError::Format(s.to_string()));
        }

        let hour: u32 = hours
            .parse()
            .map_err(|_| TimeParseError::Format(s.to_string()))?;
        let minute: u32 = minutes
            .parse()
            .map_err(|_| TimeParseError::Format(s.to_string()))?;

        TimeOfDay::new(hour, minute).ok_or_else(|| TimeParseError::OutOfRange(s.to_string()))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Render a block as `HH:MM - HH:MM`.
pub fn format_range(start: TimeOfDay, end: TimeOfDay) -> String {
    format!("{} - {}", start, end)
}

/// Inverse of [`format_range`].
pub fn parse_range(s: &str) -> Result<(TimeOfDay, TimeOfDay), TimeParseError> {
    let (start, end) = s
        .split_once(" - ")
        .ok_or_else(|| TimeParseError::Range(s.to_string()))?;
    Ok((start.parse()?, end.parse()?))
}

/// Weekday for an index in `0 = Sunday .. 6 = Saturday`.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Index of a date's weekday, `0 = Sunday`.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// First instant of `date` in `tz`.
///
/// Zones that skip midnight on a DST change start the day at the first
/// existing local time after it.
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }

    let after_gap = naive + Duration::hours(1);
    if let Some(dt) = tz.from_local_datetime(&after_gap).earliest() {
        log::warn!(
            "DST gap at midnight of {} in {}; day starts at {}",
            date,
            tz,
            dt.time()
        );
        return dt.with_timezone(&Utc);
    }

    log::warn!(
        "Could not resolve midnight of {} in {}; falling back to UTC",
        date,
        tz
    );
    Utc.from_utc_datetime(&naive)
}

/// First instant in `(from, to]` at which `tz` sets its clocks back, if any.
fn clocks_turned_back(tz: &Tz, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let offset_at = |t: DateTime<Utc>| t.with_timezone(tz).offset().fix();
    let before = offset_at(from);
    if offset_at(to).local_minus_utc() >= before.local_minus_utc() {
        return None;
    }

    let (mut lo, mut hi) = (from, to);
    while hi - lo > Duration::seconds(1) {
        let mid = lo + (hi - lo) / 2;
        if offset_at(mid) == before {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(hi)
}

/// Cut an instant interval into per-date blocks of local wall-clock time.
///
/// A block that runs past local midnight ends at `24:00` and continues on the
/// next date from `00:00`. When clocks go back, the block is cut at the
/// change so each piece reads forward on its own clock. Blocks that are empty
/// once seconds are dropped are skipped.
pub fn split_by_local_day(interval: &FreeInterval, tz: &Tz) -> Vec<FreeBlock> {
    let mut blocks = Vec::new();
    let mut cursor = interval.start;

    while cursor < interval.end {
        let local = cursor.with_timezone(tz);
        let date = local.date_naive();
        let Some(next_date) = date.succ_opt() else {
            break;
        };
        let next_midnight = local_midnight(tz, next_date);
        if next_midnight <= cursor {
            break;
        }

        let mut segment_end = interval.end.min(next_midnight);
        let start = TimeOfDay::from_naive_time(local.time());
        let end = if let Some(fold) = clocks_turned_back(tz, cursor, segment_end) {
            // Stop at the fall-back instant, read on the pre-change clock.
            segment_end = fold;
            let wall = fold.with_timezone(&local.offset().fix());
            if wall.date_naive() > date {
                TimeOfDay::END_OF_DAY
            } else {
                TimeOfDay::from_naive_time(wall.time())
            }
        } else if segment_end == next_midnight {
            TimeOfDay::END_OF_DAY
        } else {
            TimeOfDay::from_naive_time(segment_end.with_timezone(tz).time())
        };

        if start < end {
            blocks.push(FreeBlock { date, start, end });
        }
        cursor = segment_end;
    }

    blocks
}

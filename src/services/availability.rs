// Availability service: validates the caller's range, fetches busy time for
// the horizon and runs sweep, day split, trim and group.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::calendar_source::CalendarSource;
use crate::error::ScheduleError;
use crate::locale::WeekdayLocale;
use crate::schedule::interval::weekday_from_index;
use crate::schedule::{self, TimeOfDay, HORIZON_DAYS};
use crate::types::{BusyInterval, ConsideredRange, FreeBlock, HourWindow, WeeklySchedule};

/// Fixed per-deployment settings: zone the slots are expressed in, label
/// language and horizon length.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    pub locale: WeekdayLocale,
    pub horizon_days: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Warsaw,
            locale: WeekdayLocale::default(),
            horizon_days: HORIZON_DAYS,
        }
    }
}

/// Caller preferences for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQuery {
    /// Weekday indices, `0 = Sunday`
    pub days: Vec<u8>,
    /// Whole hours, `[start, end)`, `0..=24`
    pub hour_range: (u32, u32),
    pub meeting_length_minutes: u32,
}

impl ScheduleQuery {
    /// Parse the comma-separated form used by the query API:
    /// `days=1,2,3`, `hoursRange=8,20`, `meetingLength=60`.
    pub fn parse(days: &str, hours_range: &str, meeting_length: &str) -> Result<Self, ScheduleError> {
        let days = days
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                d.parse::<u8>()
                    .map_err(|_| ScheduleError::Validation(format!("day index {:?} is not a number", d)))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        let hours = hours_range
            .split(',')
            .map(str::trim)
            .map(|h| {
                h.parse::<u32>()
                    .map_err(|_| ScheduleError::Validation(format!("hour {:?} is not a whole hour", h)))
            })
            .collect::<Result<Vec<u32>, _>>()?;
        let [start, end] = hours[..] else {
            return Err(ScheduleError::Validation(format!(
                "hoursRange needs exactly two hours, got {:?}",
                hours_range
            )));
        };

        let meeting_length_minutes = meeting_length.trim().parse::<u32>().map_err(|_| {
            ScheduleError::Validation(format!(
                "meetingLength {:?} is not a non-negative number of minutes",
                meeting_length
            ))
        })?;

        Ok(Self {
            days,
            hour_range: (start, end),
            meeting_length_minutes,
        })
    }

    /// Check bounds and build the range used for trimming.
    pub fn considered_range(&self) -> Result<ConsideredRange, ScheduleError> {
        let days = self
            .days
            .iter()
            .map(|&index| {
                weekday_from_index(index).ok_or_else(|| {
                    ScheduleError::Validation(format!("day index {} is outside 0-6", index))
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let (start_hour, end_hour) = self.hour_range;
        let out_of_bounds =
            || ScheduleError::Validation(format!("hour range {},{} is outside 0-24", start_hour, end_hour));
        let start = TimeOfDay::from_hour(start_hour).ok_or_else(out_of_bounds)?;
        let end = TimeOfDay::from_hour(end_hour).ok_or_else(out_of_bounds)?;

        Ok(ConsideredRange {
            days,
            hour_window: HourWindow::new(start, end)?,
            min_meeting_minutes: self.meeting_length_minutes,
        })
    }
}

/// Free, trimmed and grouped slots for busy time already fetched.
pub fn build_schedule(
    busy: &[BusyInterval],
    range: &ConsideredRange,
    now: DateTime<Utc>,
    settings: &ScheduleSettings,
) -> WeeklySchedule {
    let (horizon_start, horizon_end) = schedule::horizon(now, settings.horizon_days);
    let free = schedule::derive_free(busy, horizon_start, horizon_end);

    let blocks: Vec<FreeBlock> = free
        .iter()
        .flat_map(|interval| schedule::split_by_local_day(interval, &settings.timezone))
        .collect();
    let trimmed = schedule::trim(&blocks, range);

    log::debug!(
        "{} busy → {} free intervals → {} day blocks → {} in range",
        busy.len(),
        free.len(),
        blocks.len(),
        trimmed.len()
    );

    let today = now.with_timezone(&settings.timezone).date_naive();
    schedule::group(&trimmed, today, settings.locale)
}

pub struct AvailabilityService {
    source: Arc<dyn CalendarSource>,
    settings: ScheduleSettings,
}

impl AvailabilityService {
    pub fn new(source: Arc<dyn CalendarSource>, settings: ScheduleSettings) -> Self {
        Self { source, settings }
    }

    pub async fn compute_schedule(&self, query: &ScheduleQuery) -> Result<WeeklySchedule, ScheduleError> {
        self.compute_schedule_at(query, Utc::now()).await
    }

    /// Same as [`compute_schedule`](Self::compute_schedule) with an explicit "now".
    pub async fn compute_schedule_at(
        &self,
        query: &ScheduleQuery,
        now: DateTime<Utc>,
    ) -> Result<WeeklySchedule, ScheduleError> {
        // Reject bad input before touching the calendar.
        let range = query.considered_range()?;

        let (time_min, time_max) = schedule::horizon(now, self.settings.horizon_days);
        let busy = self
            .source
            .get_busy(time_min, time_max, self.settings.timezone)
            .await?;

        let schedule = build_schedule(&busy, &range, now, &self.settings);
        log::info!(
            "Schedule for days {:?}, hours {}-{}, min {}m: {} days with free slots",
            query.days,
            query.hour_range.0,
            query.hour_range.1,
            query.meeting_length_minutes,
            schedule.len()
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};

    use super::*;

    struct FakeSource {
        busy: Vec<BusyInterval>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(busy: Vec<BusyInterval>) -> Arc<Self> {
            Arc::new(Self {
                busy,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CalendarSource for FakeSource {
        async fn get_busy(
            &self,
            time_min: DateTime<Utc>,
            time_max: DateTime<Utc>,
            _timezone: Tz,
        ) -> Result<Vec<BusyInterval>, ScheduleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(time_max - time_min, Duration::days(7));
            Ok(self.busy.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CalendarSource for FailingSource {
        async fn get_busy(
            &self,
            _time_min: DateTime<Utc>,
            _time_max: DateTime<Utc>,
            _timezone: Tz,
        ) -> Result<Vec<BusyInterval>, ScheduleError> {
            Err(ScheduleError::Upstream("connection refused".to_string()))
        }
    }

    fn utc_settings(locale: WeekdayLocale) -> ScheduleSettings {
        ScheduleSettings {
            timezone: chrono_tz::UTC,
            locale,
            horizon_days: 7,
        }
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn query(days: &[u8], hours: (u32, u32), length: u32) -> ScheduleQuery {
        ScheduleQuery {
            days: days.to_vec(),
            hour_range: hours,
            meeting_length_minutes: length,
        }
    }

    #[test]
    fn test_parse_query_string_form() {
        let q = ScheduleQuery::parse("1,2, 3", "8,20", "60").unwrap();
        assert_eq!(q, query(&[1, 2, 3], (8, 20), 60));

        let q = ScheduleQuery::parse("", "0,24", "0").unwrap();
        assert!(q.days.is_empty());
    }

    #[test]
    fn test_parse_query_rejects_malformed_input() {
        for (days, hours, length) in [
            ("1,x", "8,20", "60"),
            ("1", "8", "60"),
            ("1", "8,12,20", "60"),
            ("1", "8,", "60"),
            ("1", "8.5,20", "60"),
            ("1", "8,20", "-5"),
            ("1", "8,20", "an hour"),
        ] {
            let err = ScheduleQuery::parse(days, hours, length).unwrap_err();
            assert!(
                matches!(err, ScheduleError::Validation(_)),
                "{:?} {:?} {:?}",
                days,
                hours,
                length
            );
        }
    }

    #[test]
    fn test_considered_range_bounds() {
        assert!(query(&[1], (8, 20), 0).considered_range().is_ok());
        assert!(query(&[0, 6], (0, 24), 0).considered_range().is_ok());

        for bad in [
            query(&[7], (8, 20), 0),
            query(&[1], (20, 8), 0),
            query(&[1], (8, 8), 0),
            query(&[1], (8, 25), 0),
            query(&[1], (22, 2), 0),
        ] {
            assert!(matches!(
                bad.considered_range(),
                Err(ScheduleError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_validation_happens_before_upstream_call() {
        let source = FakeSource::new(Vec::new());
        let service = AvailabilityService::new(source.clone(), utc_settings(WeekdayLocale::English));

        let err = service
            .compute_schedule_at(&query(&[1], (10, 8), 30), at(1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let service = AvailabilityService::new(Arc::new(FailingSource), utc_settings(WeekdayLocale::English));
        let err = service
            .compute_schedule_at(&query(&[1], (8, 20), 30), at(1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_workweek_mornings() {
        // Monday Jan 1 2024, 07:00 UTC. One busy hour Tuesday 09:00-10:00.
        let source = FakeSource::new(vec![BusyInterval {
            start: at(2, 9, 0),
            end: at(2, 10, 0),
        }]);
        let service = AvailabilityService::new(source.clone(), utc_settings(WeekdayLocale::English));

        let schedule = service
            .compute_schedule_at(&query(&[1, 2, 3, 4, 5], (8, 10), 30), at(1, 7, 0))
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let summary: Vec<(&str, NaiveDate, Vec<&str>)> = schedule
            .iter()
            .map(|d| (d.day.as_str(), d.date, d.blocks.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Monday", date(1), vec!["08:00 - 10:00"]),
                ("Tuesday", date(2), vec!["08:00 - 09:00"]),
                ("Wednesday", date(3), vec!["08:00 - 10:00"]),
                ("Thursday", date(4), vec!["08:00 - 10:00"]),
                ("Friday", date(5), vec!["08:00 - 10:00"]),
            ]
        );
    }

    #[test]
    fn test_today_is_clipped_to_now() {
        // Query at 08:45 on Monday: today's slot starts at 08:45.
        let range = query(&[1], (8, 10), 60).considered_range().unwrap();
        let schedule = build_schedule(&[], &range, at(1, 8, 45), &utc_settings(WeekdayLocale::Polish));

        assert_eq!(schedule[0].day, "Poniedziałek");
        assert_eq!(schedule[0].date, date(1));
        assert_eq!(schedule[0].blocks, vec!["08:45 - 10:00"]);
        // The horizon ends at 08:45 on Jan 8, leaving a 45 minute sliver.
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn test_nothing_starts_after_the_horizon() {
        // Saturday Jan 6, 12:00; horizon ends Saturday Jan 13, 12:00.
        let now = at(6, 12, 0);
        let range = query(&[6], (0, 24), 0).considered_range().unwrap();
        let schedule = build_schedule(&[], &range, now, &utc_settings(WeekdayLocale::English));

        let horizon_end = now + Duration::days(7);
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].blocks, vec!["12:00 - 24:00"]);
        assert_eq!(schedule[1].date, date(13));
        assert_eq!(schedule[1].blocks, vec!["00:00 - 12:00"]);
        for day in &schedule {
            for block in &day.blocks {
                let (start, _) = crate::schedule::interval::parse_range(block).unwrap();
                assert!(start.on(day.date) < horizon_end.naive_utc());
            }
        }
    }

    #[test]
    fn test_local_zone_shifts_blocks() {
        // 07:00Z is 08:00 in Warsaw in January.
        let settings = ScheduleSettings::default();
        let busy = vec![BusyInterval {
            start: at(2, 7, 0),
            end: at(2, 8, 0),
        }];
        let range = query(&[2], (8, 10), 0).considered_range().unwrap();
        let schedule = build_schedule(&busy, &range, at(1, 12, 0), &settings);

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].day, "Wtorek");
        assert_eq!(schedule[0].blocks, vec!["09:00 - 10:00"]);
    }

    #[test]
    fn test_multi_day_free_time_is_not_lost() {
        // Busy only Monday 09:00-17:00; Tuesday through Thursday are wide open.
        let busy = vec![BusyInterval {
            start: at(1, 9, 0),
            end: at(1, 17, 0),
        }];
        let range = query(&[2, 3, 4], (9, 17), 60).considered_range().unwrap();
        let schedule = build_schedule(&busy, &range, at(1, 8, 0), &utc_settings(WeekdayLocale::English));

        let days: Vec<&str> = schedule.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(days, vec!["Tuesday", "Wednesday", "Thursday"]);
        assert!(schedule.iter().all(|d| d.blocks == vec!["09:00 - 17:00"]));
    }
}

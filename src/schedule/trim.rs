//! Clip free blocks to the considered weekdays and hour window.

use crate::types::{ConsideredRange, FreeBlock};

/// Keep the part of each block that falls on a considered weekday, inside the
/// hour window, and is at least `min_meeting_minutes` long. Input order is
/// preserved.
pub fn trim(blocks: &[FreeBlock], range: &ConsideredRange) -> Vec<FreeBlock> {
    blocks
        .iter()
        .filter_map(|block| trim_block(block, range))
        .collect()
}

pub fn trim_block(block: &FreeBlock, range: &ConsideredRange) -> Option<FreeBlock> {
    if !range.includes_day(block.weekday()) {
        return None;
    }

    let start = block.start.max(range.hour_window.start);
    let end = block.end.min(range.hour_window.end);
    if start >= end {
        return None;
    }

    let clipped = FreeBlock {
        date: block.date,
        start,
        end,
    };
    // Length is judged after clipping, not on the original block.
    if clipped.duration_minutes() < i64::from(range.min_meeting_minutes) {
        return None;
    }

    Some(clipped)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{NaiveDate, Weekday};

    use super::*;
    use crate::schedule::interval::TimeOfDay;
    use crate::types::HourWindow;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    // 2024-01-01 is a Monday.
    fn block(day: u32, start: &str, end: &str) -> FreeBlock {
        FreeBlock {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            start: t(start),
            end: t(end),
        }
    }

    fn range(days: &[Weekday], start: &str, end: &str, min: u32) -> ConsideredRange {
        ConsideredRange {
            days: days.iter().copied().collect::<HashSet<_>>(),
            hour_window: HourWindow::new(t(start), t(end)).unwrap(),
            min_meeting_minutes: min,
        }
    }

    const WORKWEEK: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    #[test]
    fn test_block_overhanging_window_is_clipped() {
        let r = range(&WORKWEEK, "08:00", "10:00", 0);
        assert_eq!(
            trim_block(&block(2, "07:30", "10:30"), &r),
            Some(block(2, "08:00", "10:00"))
        );
    }

    #[test]
    fn test_short_block_is_discarded() {
        let r = range(&WORKWEEK, "08:00", "10:00", 30);
        assert_eq!(trim_block(&block(2, "08:00", "08:10"), &r), None);
    }

    #[test]
    fn test_block_exactly_min_length_is_kept() {
        let r = range(&WORKWEEK, "08:00", "10:00", 30);
        assert_eq!(
            trim_block(&block(2, "09:30", "10:00"), &r),
            Some(block(2, "09:30", "10:00"))
        );
    }

    #[test]
    fn test_length_is_measured_after_clipping() {
        // 2h of free time but only 20 minutes of it inside the window.
        let r = range(&WORKWEEK, "08:00", "10:00", 30);
        assert_eq!(trim_block(&block(2, "09:40", "11:40"), &r), None);
    }

    #[test]
    fn test_block_on_excluded_weekday_is_discarded() {
        let r = range(&WORKWEEK, "08:00", "10:00", 0);
        // Jan 6 is a Saturday, Jan 7 a Sunday
        assert_eq!(trim_block(&block(6, "08:00", "10:00"), &r), None);
        assert_eq!(trim_block(&block(7, "08:00", "10:00"), &r), None);
    }

    #[test]
    fn test_block_outside_window_is_discarded() {
        let r = range(&WORKWEEK, "08:00", "10:00", 0);
        assert_eq!(trim_block(&block(2, "10:00", "12:00"), &r), None);
        assert_eq!(trim_block(&block(2, "06:00", "08:00"), &r), None);
    }

    #[test]
    fn test_end_of_day_window_keeps_evening_blocks() {
        let r = range(&WORKWEEK, "18:00", "24:00", 60);
        assert_eq!(
            trim_block(&block(2, "17:00", "24:00"), &r),
            Some(block(2, "18:00", "24:00"))
        );
    }

    #[test]
    fn test_trimming_is_idempotent() {
        let r = range(&WORKWEEK, "08:00", "16:00", 30);
        let input = vec![
            block(1, "06:00", "09:00"),
            block(2, "11:00", "18:00"),
            block(3, "08:15", "08:40"),
        ];
        let once = trim(&input, &r);
        let twice = trim(&once, &r);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_respects_range_and_order() {
        let r = range(&[Weekday::Mon, Weekday::Wed], "09:00", "17:00", 45);
        let input = vec![
            block(1, "00:00", "09:30"),
            block(1, "12:00", "13:00"),
            block(2, "09:00", "17:00"),
            block(3, "08:00", "24:00"),
            block(3, "16:30", "17:30"),
        ];
        let out = trim(&input, &r);

        assert_eq!(
            out,
            vec![block(1, "12:00", "13:00"), block(3, "09:00", "17:00")]
        );
        for b in &out {
            assert!(r.includes_day(b.weekday()));
            assert!(b.duration_minutes() >= i64::from(r.min_meeting_minutes));
            assert!(b.start >= r.hour_window.start && b.end <= r.hour_window.end);
        }
    }

    #[test]
    fn test_no_considered_days_keeps_nothing() {
        let r = range(&[], "00:00", "24:00", 0);
        assert!(trim(&[block(1, "08:00", "10:00")], &r).is_empty());
    }
}

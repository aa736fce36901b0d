//! Group trimmed blocks by date and label them with weekday names.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::locale::WeekdayLocale;
use crate::types::{DaySchedule, FreeBlock, WeeklySchedule};

/// Formatted `HH:MM - HH:MM` ranges per ISO date, in the order they were seen.
pub type DailySchedule = BTreeMap<NaiveDate, Vec<String>>;

pub fn group_by_date(blocks: &[FreeBlock]) -> DailySchedule {
    let mut by_date = DailySchedule::new();
    for block in blocks {
        by_date.entry(block.date).or_default().push(block.label());
    }
    by_date
}

/// One entry per distinct date, nearest to `today` first.
///
/// Grouping is by date, so next week's Monday and this week's Monday are
/// separate entries with the same label.
pub fn group(blocks: &[FreeBlock], today: NaiveDate, locale: WeekdayLocale) -> WeeklySchedule {
    let mut schedule: WeeklySchedule = group_by_date(blocks)
        .into_iter()
        .map(|(date, ranges)| DaySchedule {
            day: locale.weekday_name(date.weekday()),
            date,
            blocks: ranges,
        })
        .collect();

    schedule.sort_by_key(|entry| (entry.date - today).num_days());
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::interval::TimeOfDay;

    fn block(day: u32, start: &str, end: &str) -> FreeBlock {
        FreeBlock {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            start: start.parse::<TimeOfDay>().unwrap(),
            end: end.parse::<TimeOfDay>().unwrap(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_empty_input_gives_empty_schedule() {
        assert!(group(&[], date(1), WeekdayLocale::Polish).is_empty());
        assert!(group_by_date(&[]).is_empty());
    }

    #[test]
    fn test_buckets_keep_insertion_order_per_date() {
        let by_date = group_by_date(&[
            block(2, "08:00", "09:00"),
            block(3, "10:00", "11:00"),
            block(2, "12:00", "13:00"),
        ]);
        assert_eq!(
            by_date.get(&date(2)),
            Some(&vec!["08:00 - 09:00".to_string(), "12:00 - 13:00".to_string()])
        );
        assert_eq!(by_date.len(), 2);
    }

    #[test]
    fn test_entries_are_labelled_and_ordered_from_today() {
        // Today is Thursday Jan 4; the week runs through Wednesday Jan 10.
        let schedule = group(
            &[
                block(9, "08:00", "10:00"),
                block(4, "15:00", "16:00"),
                block(5, "08:00", "09:00"),
            ],
            date(4),
            WeekdayLocale::Polish,
        );

        let labels: Vec<(&str, NaiveDate)> =
            schedule.iter().map(|d| (d.day.as_str(), d.date)).collect();
        assert_eq!(
            labels,
            vec![("Czwartek", date(4)), ("Piątek", date(5)), ("Wtorek", date(9))]
        );
    }

    #[test]
    fn test_same_weekday_on_different_dates_stays_separate() {
        let schedule = group(
            &[block(6, "08:00", "10:00"), block(13, "08:00", "10:00")],
            date(6),
            WeekdayLocale::English,
        );
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].day, "Saturday");
        assert_eq!(schedule[1].day, "Saturday");
        assert_ne!(schedule[0].date, schedule[1].date);
    }

    #[test]
    fn test_flattening_recovers_every_range() {
        let input = vec![
            block(3, "08:00", "09:00"),
            block(1, "10:00", "11:00"),
            block(3, "12:00", "12:45"),
            block(2, "07:00", "24:00"),
        ];
        let schedule = group(&input, date(1), WeekdayLocale::Polish);

        let mut flattened: Vec<String> = schedule
            .iter()
            .flat_map(|d| d.blocks.iter().cloned())
            .collect();
        let mut expected: Vec<String> = input.iter().map(|b| b.label()).collect();
        flattened.sort();
        expected.sort();
        assert_eq!(flattened, expected);
    }
}

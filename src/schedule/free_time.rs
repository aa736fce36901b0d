//! Busy intervals to free intervals over the query horizon.

use chrono::{DateTime, Duration, Utc};

use crate::types::{BusyInterval, FreeInterval};

/// Length of the look-ahead window, starting at query time.
pub const HORIZON_DAYS: u32 = 7;

/// Longest configurable look-ahead.
pub const MAX_HORIZON_DAYS: u32 = 31;

/// `[now, now + days)`, with `days` capped at [`MAX_HORIZON_DAYS`].
pub fn horizon(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let days = Duration::days(i64::from(days.min(MAX_HORIZON_DAYS)));
    (now, now.checked_add_signed(days).unwrap_or(now))
}

/// Single left-to-right sweep over `busy`, emitting the gaps between them.
///
/// `busy` is expected sorted by start. Overlapping entries are absorbed by
/// the cursor never moving backwards; entries outside the horizon never
/// produce free time past `horizon_end`.
pub fn derive_free(
    busy: &[BusyInterval],
    horizon_start: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
) -> Vec<FreeInterval> {
    let mut free = Vec::new();
    let mut cursor = horizon_start;

    for period in busy {
        if cursor >= horizon_end {
            break;
        }
        let gap_end = period.start.min(horizon_end);
        if cursor < gap_end {
            free.push(FreeInterval {
                start: cursor,
                end: gap_end,
            });
        }
        cursor = cursor.max(period.end);
    }

    if cursor < horizon_end {
        free.push(FreeInterval {
            start: cursor,
            end: horizon_end,
        });
    }

    debug_assert!(free.iter().all(|f| f.start < f.end));
    debug_assert!(free.windows(2).all(|w| w[0].end <= w[1].start));
    free
}

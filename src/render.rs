//! Plain-text rendering of a weekly schedule, one paragraph per day.

use crate::types::WeeklySchedule;

/// ```text
/// Poniedziałek:
/// 08:00 - 10:00
///
/// Wtorek:
/// 08:00 - 09:00
/// ```
pub fn render_text(schedule: &WeeklySchedule) -> String {
    schedule
        .iter()
        .map(|day| {
            let mut paragraph = format!("{}:", day.day);
            for block in &day.blocks {
                paragraph.push('\n');
                paragraph.push_str(block);
            }
            paragraph
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

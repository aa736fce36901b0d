//! Google Calendar API v3 — free/busy query.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{send_with_retry, GoogleApiError, RetryPolicy};
use crate::types::BusyInterval;

const FREE_BUSY_URL: &str = "https://www.googleapis.com/calendar/v3/freeBusy";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    time_zone: &'a str,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, CalendarBusy>,
}

#[derive(Debug, Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<TimePeriod>,
    #[serde(default)]
    errors: Vec<CalendarErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct TimePeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct CalendarErrorEntry {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

// ============================================================================
// Calendar API
// ============================================================================

/// Fetch busy periods of `calendar_id` between `time_min` and `time_max`.
///
/// Google returns them merged and sorted by start.
pub async fn query_busy(
    access_token: &str,
    calendar_id: &str,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    time_zone: &str,
    policy: &RetryPolicy,
) -> Result<Vec<BusyInterval>, GoogleApiError> {
    let body = FreeBusyRequest {
        time_min: time_min.to_rfc3339_opts(SecondsFormat::Millis, true),
        time_max: time_max.to_rfc3339_opts(SecondsFormat::Millis, true),
        time_zone,
        items: vec![FreeBusyItem { id: calendar_id }],
    };

    let request = reqwest::Client::new()
        .post(FREE_BUSY_URL)
        .bearer_auth(access_token)
        .json(&body);
    let resp = send_with_retry(request, policy).await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    let text = resp.text().await?;
    let parsed: FreeBusyResponse = serde_json::from_str(&text)
        .map_err(|e| GoogleApiError::MalformedResponse(format!("freeBusy body: {}", e)))?;
    busy_intervals(parsed, calendar_id)
}

fn busy_intervals(
    mut response: FreeBusyResponse,
    calendar_id: &str,
) -> Result<Vec<BusyInterval>, GoogleApiError> {
    let calendar = response.calendars.remove(calendar_id).ok_or_else(|| {
        GoogleApiError::MalformedResponse(format!("no entry for calendar {}", calendar_id))
    })?;

    if let Some(err) = calendar.errors.first() {
        return Err(GoogleApiError::MalformedResponse(format!(
            "calendar {} reported {}/{}",
            calendar_id, err.domain, err.reason
        )));
    }

    let mut intervals = Vec::with_capacity(calendar.busy.len());
    for period in calendar.busy {
        let start = parse_event_datetime(&period.start).ok_or_else(|| {
            GoogleApiError::MalformedResponse(format!("busy start {:?}", period.start))
        })?;
        let end = parse_event_datetime(&period.end).ok_or_else(|| {
            GoogleApiError::MalformedResponse(format!("busy end {:?}", period.end))
        })?;
        if end <= start {
            log::debug!("Skipping empty busy period {} - {}", period.start, period.end);
            continue;
        }
        intervals.push(BusyInterval { start, end });
    }
    Ok(intervals)
}

/// Parse an RFC 3339 datetime to UTC.
pub fn parse_event_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::error::ScheduleError;
use crate::services::ScheduleQuery;
use crate::types::WeeklySchedule;

/// Raw query string of `GET /api/free-schedule`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeScheduleParams {
    pub days: Option<String>,
    pub hours_range: Option<String>,
    pub meeting_length: Option<String>,
}

impl FreeScheduleParams {
    pub fn into_query(self) -> Result<ScheduleQuery, ScheduleError> {
        let days = required(self.days, "days")?;
        let hours_range = required(self.hours_range, "hoursRange")?;
        let meeting_length = required(self.meeting_length, "meetingLength")?;
        ScheduleQuery::parse(&days, &hours_range, &meeting_length)
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ScheduleError> {
    value.ok_or_else(|| ScheduleError::Validation(format!("missing query parameter {}", name)))
}

/// GET /api/free-schedule
pub async fn get_free_schedule(
    State(state): State<AppState>,
    Query(params): Query<FreeScheduleParams>,
) -> Result<Json<WeeklySchedule>, ScheduleError> {
    log::debug!("GET /api/free-schedule {:?}", params);
    let query = params.into_query()?;
    let schedule = state.service.compute_schedule(&query).await?;
    Ok(Json(schedule))
}

/// GET /api/health
pub async fn health() -> &'static str {
    "ok"
}

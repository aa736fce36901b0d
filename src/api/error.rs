//! HTTP mapping of schedule errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{ErrorBody, ScheduleError};

pub fn status_for(err: &ScheduleError) -> StatusCode {
    match err {
        ScheduleError::Validation(_) => StatusCode::BAD_REQUEST,
        ScheduleError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
        ScheduleError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ScheduleError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            log::error!("Free-schedule query failed: {}", self);
        } else {
            log::info!("Free-schedule query rejected: {}", self);
        }
        let body = ErrorBody::new(&self, status.as_u16());
        (status, Json(body)).into_response()
    }
}

//! Error types for schedule queries
//!
//! Errors are classified by who can fix them:
//! - Upstream: calendar provider unreachable or returned malformed data
//! - Validation: caller-supplied query parameters out of bounds
//! - AuthRequired: no usable credential, an interactive sign-in is needed

use thiserror::Error;

use crate::google_api::GoogleApiError;

/// Error types for schedule queries
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("Calendar source error: {0}")]
    Upstream(String),

    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Calendar authorization required: {0}")]
    AuthRequired(String),
}

impl ScheduleError {
    /// Returns true if the same query may succeed when issued again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScheduleError::Upstream(_))
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(self, ScheduleError::AuthRequired(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::Upstream(_) => ErrorKind::Upstream,
            ScheduleError::Validation(_) => ErrorKind::Validation,
            ScheduleError::AuthRequired(_) => ErrorKind::AuthRequired,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ScheduleError::Upstream(_) => {
                "Check your internet connection and that the calendar is reachable, then try again."
            }
            ScheduleError::Validation(_) => {
                "Use weekday indices 0-6, an hour range like 8,20 within 0-24, and a meeting length in minutes."
            }
            ScheduleError::AuthRequired(_) => "Run 'freeslot auth' to sign in to Google Calendar.",
        }
    }
}

impl From<GoogleApiError> for ScheduleError {
    fn from(err: GoogleApiError) -> Self {
        match err {
            GoogleApiError::AuthExpired
            | GoogleApiError::TokenNotFound(_)
            | GoogleApiError::CredentialsNotFound(_)
            | GoogleApiError::InvalidCredentials(_)
            | GoogleApiError::FlowCancelled
            | GoogleApiError::OAuthStateMismatch => ScheduleError::AuthRequired(err.to_string()),
            other => ScheduleError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Upstream,
    Validation,
    AuthRequired,
}

/// Serializable error representation for the query API
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
    pub kind: ErrorKind,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

impl ErrorBody {
    pub fn new(err: &ScheduleError, status: u16) -> Self {
        ErrorBody {
            error: err.to_string(),
            status,
            kind: err.kind(),
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

//! Where busy intervals come from.
//!
//! The schedule service only sees the `CalendarSource` trait; the Google
//! implementation owns authorization and the HTTP call.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::error::ScheduleError;
use crate::google_api::{self, calendar, GoogleApiError, GoogleToken, RetryPolicy, TokenStore};
use crate::types::BusyInterval;

#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Busy intervals between `time_min` and `time_max`, sorted by start.
    async fn get_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<Vec<BusyInterval>, ScheduleError>;
}

/// Free/busy of one Google calendar.
pub struct GoogleCalendarSource {
    store: TokenStore,
    credentials_path: PathBuf,
    calendar_id: String,
    interactive_auth: bool,
    save_token: bool,
    retry: RetryPolicy,
    /// Serializes first-time consent and holds the token when it is not persisted.
    session: Mutex<Option<GoogleToken>>,
}

impl GoogleCalendarSource {
    pub fn new(store: TokenStore, credentials_path: PathBuf, calendar_id: impl Into<String>) -> Self {
        Self {
            store,
            credentials_path,
            calendar_id: calendar_id.into(),
            interactive_auth: false,
            save_token: true,
            retry: RetryPolicy::default(),
            session: Mutex::new(None),
        }
    }

    /// Run the browser consent flow when no token is available.
    pub fn with_interactive_auth(mut self, enabled: bool) -> Self {
        self.interactive_auth = enabled;
        self
    }

    /// Persist tokens acquired through consent to the token store.
    pub fn with_save_token(mut self, enabled: bool) -> Self {
        self.save_token = enabled;
        self
    }

    /// Read the stored token if present, otherwise acquire one once.
    async fn access_token(&self) -> Result<String, GoogleApiError> {
        match google_api::get_valid_access_token(&self.store, &self.credentials_path).await {
            Err(GoogleApiError::TokenNotFound(path)) => self.acquire_token(path).await,
            other => other,
        }
    }

    async fn acquire_token(&self, missing: PathBuf) -> Result<String, GoogleApiError> {
        let mut session = self.session.lock().await;

        if let Some(token) = session.clone() {
            if !google_api::is_token_expired(&token) {
                return Ok(token.access_token);
            }
            if token.refresh_token.is_some() {
                let credentials = google_api::load_credentials(&self.credentials_path)?;
                match google_api::exchange_refresh_token(&credentials.installed, &token).await {
                    Ok(fresh) => {
                        log::info!("Refreshed session Google access token");
                        let access_token = fresh.access_token.clone();
                        *session = Some(fresh);
                        return Ok(access_token);
                    }
                    Err(GoogleApiError::AuthExpired) => {
                        log::warn!("Session refresh token revoked, authorization needed again");
                        *session = None;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        // A concurrent request may have completed consent while we waited.
        if let Ok(token) = self.store.load() {
            if !google_api::is_token_expired(&token) {
                return Ok(token.access_token);
            }
        }

        if !self.interactive_auth {
            return Err(GoogleApiError::TokenNotFound(missing));
        }

        let credentials = google_api::load_credentials(&self.credentials_path)?;
        let token = google_api::auth::run_consent_flow(&credentials).await?;
        if self.save_token {
            self.store.save(&token)?;
            log::info!("Saved Google token to {}", self.store.path().display());
        }
        let access_token = token.access_token.clone();
        *session = Some(token);
        Ok(access_token)
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarSource {
    async fn get_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<Vec<BusyInterval>, ScheduleError> {
        let access_token = self.access_token().await?;
        let busy = calendar::query_busy(
            &access_token,
            &self.calendar_id,
            time_min,
            time_max,
            timezone.name(),
            &self.retry,
        )
        .await?;
        log::debug!(
            "Calendar {} has {} busy periods between {} and {}",
            self.calendar_id,
            busy.len(),
            time_min,
            time_max
        );
        Ok(busy)
    }
}

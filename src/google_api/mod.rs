//! Native Google API client for the calendar free/busy query.
//!
//! Talks to Google over plain HTTP via reqwest. The token file format is the
//! one the googleapis Node client writes (`access_token`, `expiry_date` in
//! epoch milliseconds), so an existing token.json keeps working.
//!
//! Modules:
//! - auth: OAuth2 browser consent flow
//! - calendar: Google Calendar API v3 freeBusy
//! - token_store: token.json persistence

pub mod auth;
pub mod calendar;
pub mod token_store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use token_store::TokenStore;

/// Google OAuth2 scopes used by freeslot.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar.events.freebusy"];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// ============================================================================
// Token types
// ============================================================================

/// OAuth2 token payload persisted in token.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

/// OAuth2 client credentials from credentials.json (Desktop App type).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub installed: InstalledAppCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledAppCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),
    #[error("Token not found at {0}")]
    TokenNotFound(PathBuf),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OAuth flow cancelled")]
    FlowCancelled,
    #[error("Invalid credentials format: {0}")]
    InvalidCredentials(String),
    #[error("OAuth state mismatch")]
    OAuthStateMismatch,
}

// ============================================================================
// Retrying transport
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Duration::from_secs(secs.min(30));
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send a request, retrying throttling, server errors and connect/timeout
/// failures with exponential backoff.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GoogleApiError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(GoogleApiError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "google_api retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                if (err.is_timeout() || err.is_connect()) && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "google_api retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(GoogleApiError::Http(err));
            }
        }
    }

    Err(GoogleApiError::ApiError {
        status: 0,
        message: "request exhausted retries".to_string(),
    })
}

// ============================================================================
// Client credentials
// ============================================================================

/// Load OAuth client credentials.
///
/// Resolution order:
/// 1. credentials.json at `path`, if it exists
/// 2. `GOOGLE_CLIENT_ID` / `GOOGLE_API_SECRET` environment variables
pub fn load_credentials(path: &Path) -> Result<ClientCredentials, GoogleApiError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        return serde_json::from_str(&content).map_err(|e| {
            GoogleApiError::InvalidCredentials(format!("{}: {}", path.display(), e))
        });
    }

    credentials_from_env(
        std::env::var("GOOGLE_CLIENT_ID").ok(),
        std::env::var("GOOGLE_API_SECRET").ok(),
    )
    .ok_or_else(|| GoogleApiError::CredentialsNotFound(path.to_path_buf()))
}

fn credentials_from_env(
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Option<ClientCredentials> {
    let client_id = client_id.filter(|id| !id.trim().is_empty())?;
    Some(ClientCredentials {
        installed: InstalledAppCredentials {
            client_id,
            client_secret: client_secret.filter(|s| !s.trim().is_empty()),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: vec!["http://localhost".to_string()],
        },
    })
}

// ============================================================================
// Token refresh
// ============================================================================

/// Global mutex to serialize concurrent token refreshes.
static TOKEN_REFRESH_MUTEX: std::sync::OnceLock<Mutex<()>> = std::sync::OnceLock::new();

fn refresh_mutex() -> &'static Mutex<()> {
    TOKEN_REFRESH_MUTEX.get_or_init(|| Mutex::new(()))
}

/// Expired, or within a minute of expiring. Tokens without an expiry are
/// treated as expired so they get refreshed.
pub fn is_token_expired(token: &GoogleToken) -> bool {
    match token.expiry_date {
        None => true,
        Some(expiry_ms) => {
            let now_ms = chrono::Utc::now().timestamp_millis();
            expiry_ms <= now_ms + 60_000
        }
    }
}

/// Exchange the refresh token for a new access token and persist it.
pub async fn refresh_access_token(
    store: &TokenStore,
    credentials: &InstalledAppCredentials,
    token: &GoogleToken,
) -> Result<GoogleToken, GoogleApiError> {
    let _guard = refresh_mutex().lock().await;

    // Another request may have refreshed while we waited for the lock.
    if let Ok(current) = store.load() {
        if current.access_token != token.access_token && !is_token_expired(&current) {
            return Ok(current);
        }
    }

    let new_token = exchange_refresh_token(credentials, token).await?;
    store.save(&new_token)?;
    log::info!("Refreshed Google access token");

    Ok(new_token)
}

/// Exchange the refresh token for a new access token without persisting it.
pub async fn exchange_refresh_token(
    credentials: &InstalledAppCredentials,
    token: &GoogleToken,
) -> Result<GoogleToken, GoogleApiError> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or(GoogleApiError::AuthExpired)?;

    let mut form = vec![
        ("client_id", credentials.client_id.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = credentials.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let resp = reqwest::Client::new()
        .post(&credentials.token_uri)
        .form(&form)
        .send()
        .await?;
    let status = resp.status();
    let body_text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(map_refresh_error(status.as_u16(), &body_text));
    }

    let body: serde_json::Value = serde_json::from_str(&body_text)?;
    token_from_grant(&body, Some(token))
}

/// Build a token from an OAuth token-endpoint response.
///
/// A refresh grant usually omits `refresh_token`; the previous one is kept.
pub(crate) fn token_from_grant(
    body: &serde_json::Value,
    previous: Option<&GoogleToken>,
) -> Result<GoogleToken, GoogleApiError> {
    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| GoogleApiError::RefreshFailed("No access_token in response".into()))?
        .to_string();
    let expires_in = body["expires_in"].as_i64().unwrap_or(3600);
    let expiry_date = chrono::Utc::now().timestamp_millis() + expires_in * 1000;

    let owned = |key: &str| body[key].as_str().map(str::to_string);
    Ok(GoogleToken {
        access_token,
        refresh_token: owned("refresh_token")
            .or_else(|| previous.and_then(|t| t.refresh_token.clone())),
        scope: owned("scope").or_else(|| previous.and_then(|t| t.scope.clone())),
        token_type: owned("token_type").or_else(|| previous.and_then(|t| t.token_type.clone())),
        expiry_date: Some(expiry_date),
    })
}

fn map_refresh_error(status: u16, body: &str) -> GoogleApiError {
    let lowered = body.to_lowercase();
    if (status == 400 || status == 401)
        && (lowered.contains("invalid_grant") || lowered.contains("token has been expired"))
    {
        return GoogleApiError::AuthExpired;
    }
    GoogleApiError::RefreshFailed(format!("HTTP {}: {}", status, body))
}

/// Get a valid access token from `store`, refreshing it if expired.
pub async fn get_valid_access_token(
    store: &TokenStore,
    credentials_path: &Path,
) -> Result<String, GoogleApiError> {
    let token = store.load()?;

    if is_token_expired(&token) {
        let credentials = load_credentials(credentials_path)?;
        let refreshed = refresh_access_token(store, &credentials.installed, &token).await?;
        Ok(refreshed.access_token)
    } else {
        Ok(token.access_token)
    }
}

// ============================================================================
// Tests
// ============================================================================

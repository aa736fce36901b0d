//! OAuth2 browser consent flow for Google APIs.
//!
//! Opens the user's browser for consent, captures the redirect on a
//! localhost listener and exchanges the auth code for tokens.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::{token_from_grant, ClientCredentials, GoogleApiError, GoogleToken, InstalledAppCredentials, SCOPES};

/// How long to wait for the user to finish consent in the browser.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Run the full OAuth2 consent flow.
///
/// 1. Start a listener on a random localhost port
/// 2. Open the browser with the auth URL
/// 3. Wait for the redirect with the auth code
/// 4. Exchange the code for tokens
///
/// The caller decides whether to persist the returned token.
pub async fn run_consent_flow(credentials: &ClientCredentials) -> Result<GoogleToken, GoogleApiError> {
    let installed = &credentials.installed;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://localhost:{}", port);
    let state = oauth_state();

    let auth_url = authorization_url(installed, &redirect_uri, &state)?;
    log::info!("Opening browser for Google OAuth consent...");
    if let Err(e) = open::that(auth_url.as_str()) {
        log::warn!("Failed to open browser: {}. URL: {}", e, auth_url);
    }

    let code = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_auth_code(&listener, &state))
        .await
        .map_err(|_| {
            log::warn!("OAuth consent timed out after {:?}", CONSENT_TIMEOUT);
            GoogleApiError::FlowCancelled
        })??;

    let mut form = vec![
        ("code", code.as_str()),
        ("client_id", installed.client_id.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];
    if let Some(secret) = installed.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let resp = reqwest::Client::new()
        .post(&installed.token_uri)
        .form(&form)
        .send()
        .await?;

    if !resp.status().is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::RefreshFailed(format!(
            "Token exchange failed: {}",
            body
        )));
    }

    let body: serde_json::Value = resp.json().await?;
    let token = token_from_grant(&body, None)?;
    log::info!("Google Calendar authorization complete");
    Ok(token)
}

fn authorization_url(
    installed: &InstalledAppCredentials,
    redirect_uri: &str,
    state: &str,
) -> Result<url::Url, GoogleApiError> {
    let scope = SCOPES.join(" ");
    url::Url::parse_with_params(
        &installed.auth_uri,
        &[
            ("client_id", installed.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| GoogleApiError::InvalidCredentials(format!("auth_uri: {}", e)))
}

/// Opaque per-flow value echoed back by Google on redirect.
fn oauth_state() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}{:x}", nanos, std::process::id())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Pull the query parameters out of `GET /?code=...&state=... HTTP/1.1`.
fn parse_redirect(request_line: &str) -> RedirectParams {
    let query = request_line
        .split_whitespace()
        .nth(1)
        .and_then(|target| target.split_once('?'))
        .map(|(_, query)| query)
        .unwrap_or("");

    let mut params = RedirectParams::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}

/// Wait for the OAuth redirect and extract the auth code.
///
/// Requests without any OAuth parameters (favicon fetches) are ignored.
async fn wait_for_auth_code(listener: &TcpListener, expected_state: &str) -> Result<String, GoogleApiError> {
    loop {
        let (mut stream, _) = listener.accept().await?;

        let mut buffer = [0u8; 4096];
        let n = stream.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..n]);
        let params = parse_redirect(request.lines().next().unwrap_or(""));

        if let Some(error) = params.error {
            log::warn!("OAuth consent denied: {}", error);
            send_response(&mut stream, "Authorization denied. You can close this tab.").await;
            return Err(GoogleApiError::FlowCancelled);
        }

        let Some(code) = params.code.filter(|c| !c.is_empty()) else {
            send_response(&mut stream, "Waiting for authorization...").await;
            continue;
        };

        if params.state.as_deref() != Some(expected_state) {
            send_response(&mut stream, "Authorization failed. You can close this tab.").await;
            return Err(GoogleApiError::OAuthStateMismatch);
        }

        send_response(
            &mut stream,
            "Authorization successful! You can close this tab and return to freeslot.",
        )
        .await;
        return Ok(code);
    }
}

/// Send an HTTP response to the browser.
async fn send_response(stream: &mut tokio::net::TcpStream, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\">\
         <h2>{}</h2></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
}

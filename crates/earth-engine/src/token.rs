//! OAuth access tokens: exchange, caching and refresh.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::credentials::StoredCredentials;
use crate::error::{EarthEngineError, EeResult};

/// Google OAuth token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// A bearer token and, when known, its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Usable at `now` with the refresh margin to spare. Tokens without an
    /// expiry never go stale.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => now + Duration::seconds(REFRESH_MARGIN_SECS) < exp,
            None => true,
        }
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Fails when `expires_in` does not fit a timestamp.
    pub fn into_access_token(self, issued_at: DateTime<Utc>) -> EeResult<AccessToken> {
        let expires_at = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        EarthEngineError::Token(format!("expires_in out of range: {}", secs))
                    })?,
            ),
            None => None,
        };

        Ok(AccessToken {
            secret: self.access_token,
            expires_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// POST a form to the token endpoint and decode the response.
pub async fn post_token_form(
    http: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> EeResult<TokenResponse> {
    let response = http.post(token_url).form(form).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorBody>(&body) {
            Ok(e) => match e.error_description {
                Some(desc) => format!("{}: {}", e.error, desc),
                None => e.error,
            },
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        return Err(EarthEngineError::Token(message));
    }

    serde_json::from_str(&body)
        .map_err(|e| EarthEngineError::Token(format!("unexpected token response: {}", e)))
}

/// Where bearer tokens for API calls come from.
pub enum TokenSource {
    /// A pre-issued token, used as is.
    Static(String),
    /// Access tokens minted from a stored refresh token and cached until
    /// shortly before expiry.
    Refresh {
        http: Client,
        token_url: String,
        credentials: StoredCredentials,
        cached: RwLock<Option<AccessToken>>,
    },
}

impl TokenSource {
    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    pub fn refreshing(http: Client, credentials: StoredCredentials, token_url: &str) -> Self {
        TokenSource::Refresh {
            http,
            token_url: token_url.to_string(),
            credentials,
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, refreshing it if needed.
    pub async fn access_token(&self) -> EeResult<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Refresh {
                http,
                token_url,
                credentials,
                cached,
            } => {
                if let Some(token) = cached.read().await.as_ref() {
                    if token.is_fresh_at(Utc::now()) {
                        return Ok(token.secret.clone());
                    }
                }

                let mut guard = cached.write().await;
                // Another request may have refreshed while we waited.
                if let Some(token) = guard.as_ref() {
                    if token.is_fresh_at(Utc::now()) {
                        return Ok(token.secret.clone());
                    }
                }

                let token = refresh(http, token_url, credentials).await?;
                let secret = token.secret.clone();
                *guard = Some(token);
                Ok(secret)
            }
        }
    }
}

#[instrument(skip_all, fields(token_url = %token_url))]
async fn refresh(
    http: &Client,
    token_url: &str,
    credentials: &StoredCredentials,
) -> EeResult<AccessToken> {
    let client_id = credentials
        .client_id
        .as_deref()
        .ok_or_else(|| EarthEngineError::Token("credentials have no client_id".to_string()))?;

    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", credentials.refresh_token.as_str()),
        ("client_id", client_id),
    ];
    if let Some(secret) = credentials.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    debug!("Refreshing Earth Engine access token");
    let issued_at = Utc::now();
    let token = post_token_form(http, token_url, &form)
        .await?
        .into_access_token(issued_at)?;

    info!(expires_at = ?token.expires_at, "Obtained Earth Engine access token");
    Ok(token)
}

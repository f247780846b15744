//! Interactive OAuth authorization (authorization code + PKCE).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

use crate::credentials::StoredCredentials;
use crate::error::{EarthEngineError, EeResult};
use crate::token::post_token_form;

pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Page that displays the authorization code for the user to copy.
pub const DEFAULT_REDIRECT_URI: &str = "https://code.earthengine.google.com/client-auth/auth";

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/earthengine",
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/devstorage.full_control",
];

const VERIFIER_LEN: usize = 64;

/// A PKCE code verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(VERIFIER_LEN)
            .map(char::from)
            .collect();
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Where the user goes to grant access.
pub fn authorization_url(
    client_id: &str,
    redirect_uri: &str,
    pkce: &Pkce,
) -> EeResult<Url> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id),
            ("scope", scope.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| EarthEngineError::Token(format!("invalid authorization URL: {}", e)))
}

/// Client registration used for the exchange.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub token_url: String,
}

/// Trade an authorization code for long-lived credentials.
pub async fn exchange_code(
    http: &Client,
    client: &OAuthClient,
    code: &str,
    pkce: &Pkce,
) -> EeResult<StoredCredentials> {
    let code = code.trim();
    if code.is_empty() {
        return Err(EarthEngineError::Token(
            "authorization code is empty".to_string(),
        ));
    }

    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", pkce.verifier.as_str()),
        ("redirect_uri", client.redirect_uri.as_str()),
        ("client_id", client.client_id.as_str()),
    ];
    if let Some(secret) = client.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let response = post_token_form(http, &client.token_url, &form).await?;
    let refresh_token = response.refresh_token.ok_or_else(|| {
        EarthEngineError::Token("token response carried no refresh_token".to_string())
    })?;

    let scopes = match response.scope {
        Some(s) => s.split_whitespace().map(str::to_string).collect(),
        None => SCOPES.iter().map(|s| s.to_string()).collect(),
    };

    Ok(StoredCredentials {
        refresh_token,
        client_id: Some(client.client_id.clone()),
        client_secret: client.client_secret.clone(),
        scopes,
        project: None,
    })
}

//! Authenticated Earth Engine session and value computation.

use std::path::PathBuf;
use std::time::Duration;

use aoi_common::{BoundingBox, ValueGrid};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::credentials::StoredCredentials;
use crate::error::{EarthEngineError, EeResult};
use crate::expression::{Expression, ValueNode};
use crate::query::WaterIndexQuery;
use crate::token::{TokenSource, TOKEN_URL};

/// Public REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://earthengine.googleapis.com";

/// Connection settings for an Earth Engine session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cloud project billed for the computation.
    pub project: String,
    pub api_base_url: String,
    pub token_url: String,
    /// Credentials file; the standard location when `None`.
    pub credentials_path: Option<PathBuf>,
    /// Pre-issued bearer token, bypassing stored credentials.
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            project: "cattle-watch".to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            credentials_path: None,
            access_token: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ComputeValueRequest<'a> {
    expression: &'a Expression,
}

#[derive(Deserialize)]
struct ComputeValueResponse {
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// An authenticated handle to Earth Engine. Read-only once built, so it can
/// be shared across requests.
pub struct EarthEngineSession {
    http: Client,
    base_url: String,
    project: String,
    tokens: TokenSource,
}

impl EarthEngineSession {
    /// Load credentials and obtain a first access token.
    #[instrument(skip_all, fields(project = %config.project))]
    pub async fn initialize(config: &SessionConfig) -> EeResult<Self> {
        let http = http_client(config)?;

        let tokens = match &config.access_token {
            Some(token) => {
                info!("Using pre-issued Earth Engine access token");
                TokenSource::fixed(token.clone())
            }
            None => {
                let path = config
                    .credentials_path
                    .clone()
                    .unwrap_or_else(StoredCredentials::default_path);
                let credentials = StoredCredentials::load(&path)?;
                TokenSource::refreshing(http.clone(), credentials, &config.token_url)
            }
        };

        tokens.access_token().await?;

        info!(base_url = %config.api_base_url, "Earth Engine session initialized");
        Ok(Self::assemble(http, config, tokens))
    }

    /// Build a session without contacting the token endpoint.
    pub fn with_token_source(config: &SessionConfig, tokens: TokenSource) -> EeResult<Self> {
        Ok(Self::assemble(http_client(config)?, config, tokens))
    }

    fn assemble(http: Client, config: &SessionConfig, tokens: TokenSource) -> Self {
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            tokens,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn compute_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/value:compute",
            self.base_url, self.project
        )
    }

    /// Evaluate an expression remotely and return its JSON result.
    #[instrument(skip_all, fields(project = %self.project))]
    pub async fn compute_value(&self, expression: &Expression) -> EeResult<serde_json::Value> {
        let token = self.tokens.access_token().await?;
        debug!(
            root = expression.root().and_then(ValueNode::function_name),
            nodes = expression.values.len(),
            "Posting value:compute"
        );

        let response = self
            .http
            .post(self.compute_url())
            .bearer_auth(token)
            .header("x-goog-user-project", &self.project)
            .header(header::ACCEPT, "application/json")
            .json(&ComputeValueRequest { expression })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "value:compute responded");

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: ComputeValueResponse = serde_json::from_str(&body)?;
        Ok(parsed.result)
    }

    /// Run the water index query over `bbox` and return the sampled grid.
    pub async fn sample_grid(
        &self,
        query: &WaterIndexQuery,
        bbox: &BoundingBox,
    ) -> EeResult<ValueGrid> {
        let expression = query.to_expression(bbox);
        let result = self.compute_value(&expression).await?;
        parse_grid(result)
    }
}

fn http_client(config: &SessionConfig) -> EeResult<Client> {
    Ok(Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

fn api_error(status: u16, body: &str) -> EarthEngineError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(b) => match b.error.status {
            Some(s) => format!("{}: {}", s, b.error.message),
            None => b.error.message,
        },
        Err(_) => body.chars().take(200).collect(),
    };
    EarthEngineError::Api { status, message }
}

/// Interpret a compute result as a rectangular grid of numbers.
pub fn parse_grid(result: serde_json::Value) -> EeResult<ValueGrid> {
    if result.is_null() {
        return Err(EarthEngineError::MalformedResult(
            "result is null (no scene matched?)".to_string(),
        ));
    }

    let rows: Vec<Vec<f64>> = serde_json::from_value(result)
        .map_err(|e| EarthEngineError::MalformedResult(format!("expected number[][]: {}", e)))?;

    Ok(ValueGrid::from_rows(rows)?)
}

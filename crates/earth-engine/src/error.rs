//! Error types for the Earth Engine client.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using EarthEngineError.
pub type EeResult<T> = Result<T, EarthEngineError>;

#[derive(Debug, Error)]
pub enum EarthEngineError {
    #[error("Earth Engine session is not initialized")]
    NotInitialized,

    #[error("Credentials not found at {0}; run ee-authorize first")]
    CredentialsMissing(PathBuf),

    #[error("Invalid credentials file {path}: {message}")]
    InvalidCredentials { path: PathBuf, message: String },

    #[error("Token exchange failed: {0}")]
    Token(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Earth Engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed compute result: {0}")]
    MalformedResult(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EarthEngineError {
    /// Whether the failure came from the remote side rather than local setup.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            EarthEngineError::Http(_)
                | EarthEngineError::Api { .. }
                | EarthEngineError::Token(_)
                | EarthEngineError::MalformedResult(_)
        )
    }
}

impl From<aoi_common::AoiError> for EarthEngineError {
    fn from(err: aoi_common::AoiError) -> Self {
        EarthEngineError::MalformedResult(err.to_string())
    }
}

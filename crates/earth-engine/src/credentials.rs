//! Stored OAuth credentials for Earth Engine.
//!
//! The file lives at `~/.config/earthengine/credentials`, the same place the
//! Earth Engine command-line tools keep it, so either can produce it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EarthEngineError, EeResult};

/// Environment variable overriding the credentials path.
pub const CREDENTIALS_ENV: &str = "EE_CREDENTIALS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub refresh_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    /// Cloud project recorded at authorization time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl StoredCredentials {
    /// Default credentials location, honoring `EE_CREDENTIALS`.
    pub fn default_path() -> PathBuf {
        if let Ok(p) = std::env::var(CREDENTIALS_ENV) {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("earthengine")
            .join("credentials")
    }

    pub fn load(path: &Path) -> EeResult<Self> {
        if !path.exists() {
            return Err(EarthEngineError::CredentialsMissing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let creds: StoredCredentials =
            serde_json::from_str(&content).map_err(|e| EarthEngineError::InvalidCredentials {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if creds.refresh_token.trim().is_empty() {
            return Err(EarthEngineError::InvalidCredentials {
                path: path.to_path_buf(),
                message: "refresh_token is empty".to_string(),
            });
        }

        debug!(path = %path.display(), "Loaded Earth Engine credentials");
        Ok(creds)
    }

    /// Write the credentials, creating parent directories. The file is made
    /// owner-readable only on Unix.
    pub fn save(&self, path: &Path) -> EeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "Saved Earth Engine credentials");
        Ok(())
    }
}

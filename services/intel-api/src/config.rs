//! Service configuration loading and types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use aoi_common::{BoundingBox, CampSite, GridShape};
use earth_engine::client::DEFAULT_API_BASE;
use earth_engine::token::TOKEN_URL;
use earth_engine::{SessionConfig, WaterIndexQuery};
use serde::{Deserialize, Serialize};

/// Service configuration, loaded from a YAML file. Every section falls back
/// to the Bor South defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    /// Cloud project used for Earth Engine calls.
    pub project_id: String,

    /// Area of interest shown on the dashboard.
    pub aoi: BoundingBox,

    /// Known camp locations.
    pub camps: Vec<CampSite>,

    /// Marker intensity attached to every camp (VIIRS brightness units).
    pub intensity: f64,

    pub constants: DashboardConstants,

    pub satellite: SatelliteConfig,

    pub fallback: FallbackConfig,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            project_id: "cattle-watch".to_string(),
            aoi: BoundingBox::default(),
            camps: default_camps(),
            intensity: 350.5,
            constants: DashboardConstants::default(),
            satellite: SatelliteConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

fn default_camps() -> Vec<CampSite> {
    vec![
        CampSite::labeled(6.2045, 31.5543, "Bor South main cluster"),
        CampSite::labeled(6.3122, 31.6210, "Swamp crossing"),
        CampSite::labeled(6.1150, 31.4890, "Riverside return route"),
    ]
}

impl IntelConfig {
    /// Load configuration from a YAML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;

        let config: IntelConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;

        tracing::info!(
            "Loaded config from {:?} ({} camps)",
            path,
            config.camps.len()
        );
        Ok(config)
    }

    /// Check the values the request path depends on.
    pub fn validate(&self) -> Result<()> {
        self.aoi.validate().context("Invalid aoi")?;

        if self.project_id.trim().is_empty() {
            bail!("project_id must not be empty");
        }
        let scale = self.satellite.query.scale;
        if scale.is_nan() || scale <= 0.0 {
            bail!("satellite.scale must be positive");
        }
        if self.satellite.query.bands.iter().any(|b| b.is_empty()) {
            bail!("satellite.bands must name two bands");
        }
        if self.fallback.shape().is_empty() {
            bail!("fallback rows and cols must be non-zero");
        }

        for camp in &self.camps {
            if !self.aoi.contains_point(camp.lon, camp.lat) {
                tracing::warn!(
                    lat = camp.lat,
                    lon = camp.lon,
                    "Camp lies outside the aoi; its marker will be off the display plane"
                );
            }
        }
        Ok(())
    }

    /// Earth Engine connection settings.
    pub fn session_config(&self, access_token: Option<String>) -> SessionConfig {
        SessionConfig {
            project: self.project_id.clone(),
            api_base_url: self.satellite.api_base_url.clone(),
            token_url: self.satellite.token_url.clone(),
            credentials_path: self.satellite.credentials_path.clone(),
            access_token,
            request_timeout: Duration::from_secs(self.satellite.timeout_secs),
        }
    }
}

/// Values reported to the dashboard as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConstants {
    /// Regional mean index.
    pub current_ndvi: f64,

    /// Regional temperature proxy, degrees Celsius.
    pub current_temp: f64,

    pub location_id: String,
}

impl Default for DashboardConstants {
    fn default() -> Self {
        Self {
            current_ndvi: 0.44,
            current_temp: 37.8,
            location_id: "South_Sudan_Bor_Sector".to_string(),
        }
    }
}

/// Remote query plus how to reach the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteConfig {
    #[serde(flatten)]
    pub query: WaterIndexQuery,

    pub api_base_url: String,

    pub token_url: String,

    /// Credentials file; the standard location when unset.
    pub credentials_path: Option<PathBuf>,

    /// Upper bound on one compute call, in seconds.
    pub timeout_secs: u64,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            query: WaterIndexQuery::default(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            credentials_path: None,
            timeout_secs: 60,
        }
    }
}

/// Grid served when the remote fetch fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub rows: usize,
    pub cols: usize,
    pub value: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            rows: 48,
            cols: 64,
            value: 0.5,
        }
    }
}

impl FallbackConfig {
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IntelConfig::default();
        assert_eq!(config.project_id, "cattle-watch");
        assert_eq!(config.aoi.to_array(), [31.0, 6.0, 32.5, 7.5]);
        assert_eq!(config.camps.len(), 3);
        assert_eq!(config.intensity, 350.5);
        assert_eq!(config.fallback.shape(), GridShape::new(48, 64));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
project_id: herd-monitor
aoi:
  lon_min: 30.0
  lat_min: 5.0
  lon_max: 31.0
  lat_max: 6.0
camps:
  - lat: 5.5
    lon: 30.5
constants:
  location_id: Test_Sector
satellite:
  collection: COPERNICUS/S2_SR_HARMONIZED
  scale: 5000
  timeout_secs: 5
fallback:
  rows: 24
  cols: 24
"#;

        let config: IntelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.project_id, "herd-monitor");
        assert_eq!(config.aoi.to_array(), [30.0, 5.0, 31.0, 6.0]);
        assert_eq!(config.camps.len(), 1);
        assert_eq!(config.constants.location_id, "Test_Sector");
        assert_eq!(config.constants.current_temp, 37.8);
        assert_eq!(
            config.satellite.query.collection,
            "COPERNICUS/S2_SR_HARMONIZED"
        );
        assert_eq!(config.satellite.query.scale, 5000.0);
        assert_eq!(config.satellite.query.band_name, "water");
        assert_eq!(config.satellite.timeout_secs, 5);
        assert_eq!(config.fallback.shape(), GridShape::new(24, 24));
        assert_eq!(config.fallback.value, 0.5);
    }

    #[test]
    fn test_validate_rejects_degenerate_aoi() {
        let mut config = IntelConfig::default();
        config.aoi = BoundingBox::new(31.0, 6.0, 32.5, 6.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fallback() {
        let mut config = IntelConfig::default();
        config.fallback.cols = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_config() {
        let config = IntelConfig::default();
        let session = config.session_config(Some("tok".to_string()));
        assert_eq!(session.project, "cattle-watch");
        assert_eq!(session.access_token.as_deref(), Some("tok"));
        assert_eq!(session.request_timeout, Duration::from_secs(60));
    }
}

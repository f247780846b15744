//! Application state for the intel API.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::IntelConfig;
use crate::satellite::{MatrixSource, SatelliteMatrix};

/// Shared application state, read-only after startup.
pub struct AppState {
    pub config: IntelConfig,

    /// Moisture grid retrieval with fallback.
    pub satellite: SatelliteMatrix,

    /// Prometheus recorder handle, when one is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: IntelConfig, source: Arc<dyn MatrixSource>) -> Self {
        let satellite = SatelliteMatrix::new(source, &config.fallback);
        Self {
            config,
            satellite,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

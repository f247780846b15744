//! Dashboard update handler.

use std::sync::Arc;

use aoi_common::{DisplayPoint, ValueGrid};
use axum::{extract::Extension, Json};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::locations::location_proxy;
use crate::satellite::MatrixOrigin;
use crate::state::AppState;

/// Payload behind the dashboard's "Sync Data" button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Moisture index grid drawn as the map background.
    pub ndvi_matrix: ValueGrid,

    /// Camp markers.
    pub conflicts: Vec<DisplayPoint>,

    pub current_ndvi: f64,

    pub current_temp: f64,

    pub location_id: String,
}

/// GET /api/v1/update - Satellite grid and camp markers.
///
/// Always answers 200; remote failures only degrade the grid.
#[instrument(skip_all)]
pub async fn update_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<UpdateResponse> {
    counter!("intel_update_requests_total").increment(1);

    let (ndvi_matrix, origin) = state.satellite.matrix().await;

    let config = &state.config;
    let conflicts = location_proxy(&config.aoi, &config.camps, config.intensity);

    info!(
        shape = %ndvi_matrix.shape(),
        mean = ?ndvi_matrix.mean(),
        degraded = origin == MatrixOrigin::Fallback,
        markers = conflicts.len(),
        "Serving dashboard update"
    );

    Json(UpdateResponse {
        ndvi_matrix,
        conflicts,
        current_ndvi: config.constants.current_ndvi,
        current_temp: config.constants.current_temp,
        location_id: config.constants.location_id.clone(),
    })
}

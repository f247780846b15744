//! Cattle-eye intel API service library.
//!
//! Serves the dashboard's update payload: a moisture index grid sampled
//! from Earth Engine and the known camp locations projected onto the
//! dashboard's display plane.

pub mod config;
pub mod handlers;
pub mod locations;
pub mod satellite;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/update", get(handlers::update::update_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

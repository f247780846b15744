//! Router-level tests for the intel API.
//!
//! Requests are driven through the axum router in-process; the Earth Engine
//! side is either a stub source or a session pointed at a closed port.

use std::sync::Arc;

use aoi_common::{GridShape, ValueGrid};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use earth_engine::token::TokenSource;
use earth_engine::{EarthEngineError, EarthEngineSession, EeResult, WaterIndexQuery};
use serde_json::Value;
use tower::ServiceExt;

use intel_api::config::IntelConfig;
use intel_api::create_router;
use intel_api::handlers::update::UpdateResponse;
use intel_api::satellite::{EarthEngineSource, MatrixSource};
use intel_api::state::AppState;

// ============================================================================
// Helpers
// ============================================================================

struct StubSource(ValueGrid);

#[async_trait]
impl MatrixSource for StubSource {
    async fn fetch(&self) -> EeResult<ValueGrid> {
        Ok(self.0.clone())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct FailingSource;

#[async_trait]
impl MatrixSource for FailingSource {
    async fn fetch(&self) -> EeResult<ValueGrid> {
        Err(EarthEngineError::Api {
            status: 503,
            message: "UNAVAILABLE".to_string(),
        })
    }

    fn is_connected(&self) -> bool {
        true
    }
}

fn router_with(source: Arc<dyn MatrixSource>) -> axum::Router {
    let state = Arc::new(AppState::new(IntelConfig::default(), source));
    create_router(state)
}

fn disconnected_router() -> axum::Router {
    let config = IntelConfig::default();
    let source = EarthEngineSource::disconnected(config.satellite.query.clone(), config.aoi);
    router_with(Arc::new(source))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// /api/v1/update
// ============================================================================

#[tokio::test]
async fn test_update_has_all_fields_when_disconnected() {
    let (status, body) = get_json(disconnected_router(), "/api/v1/update").await;

    assert_eq!(status, StatusCode::OK);
    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 5);
    for key in [
        "ndvi_matrix",
        "conflicts",
        "current_ndvi",
        "current_temp",
        "location_id",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    assert_eq!(body["current_ndvi"], 0.44);
    assert_eq!(body["current_temp"], 37.8);
    assert_eq!(body["location_id"], "South_Sudan_Bor_Sector");
}

#[tokio::test]
async fn test_update_serves_fallback_grid_when_disconnected() {
    let (_, body) = get_json(disconnected_router(), "/api/v1/update").await;
    let update: UpdateResponse = serde_json::from_value(body).unwrap();

    assert_eq!(
        update.ndvi_matrix,
        ValueGrid::constant(GridShape::new(48, 64), 0.5)
    );
}

#[tokio::test]
async fn test_update_conflicts() {
    let (_, body) = get_json(disconnected_router(), "/api/v1/update").await;
    let update: UpdateResponse = serde_json::from_value(body).unwrap();

    assert_eq!(update.conflicts.len(), 3);
    for p in &update.conflicts {
        assert!((0.0..=1.0).contains(&p.x));
        assert!((0.0..=1.0).contains(&p.y));
        assert_eq!(p.intensity, 350.5);
    }
    assert_close(update.conflicts[0].x, 0.3695);
    assert_close(update.conflicts[0].y, 0.8637);
    assert_close(update.conflicts[1].x, 0.414);
    assert_close(update.conflicts[1].y, 0.7919);
    assert_close(update.conflicts[2].x, 0.326);
    assert_close(update.conflicts[2].y, 0.9233);
}

#[tokio::test]
async fn test_update_serves_remote_grid() {
    let remote = ValueGrid::from_rows(vec![vec![0.1, -0.2], vec![0.3, 0.4]]).unwrap();
    let app = router_with(Arc::new(StubSource(remote)));

    let (status, body) = get_json(app, "/api/v1/update").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ndvi_matrix"], serde_json::json!([[0.1, -0.2], [0.3, 0.4]]));
}

#[tokio::test]
async fn test_update_survives_remote_error() {
    let app = router_with(Arc::new(FailingSource));
    let (status, body) = get_json(app, "/api/v1/update").await;
    assert_eq!(status, StatusCode::OK);

    let update: UpdateResponse = serde_json::from_value(body).unwrap();
    assert_eq!(update.ndvi_matrix.shape(), GridShape::new(48, 64));
}

#[tokio::test]
async fn test_update_with_unreachable_earth_engine() {
    let mut config = IntelConfig::default();
    config.satellite.api_base_url = "http://127.0.0.1:1".to_string();
    config.satellite.timeout_secs = 2;

    let session_config = config.session_config(None);
    let session =
        EarthEngineSession::with_token_source(&session_config, TokenSource::fixed("ya29.test"))
            .unwrap();
    let source = EarthEngineSource::with_session(session, WaterIndexQuery::default(), config.aoi);
    let app = create_router(Arc::new(AppState::new(config, Arc::new(source))));

    let (status, body) = get_json(app, "/api/v1/update").await;
    assert_eq!(status, StatusCode::OK);

    let update: UpdateResponse = serde_json::from_value(body).unwrap();
    assert_eq!(
        update.ndvi_matrix,
        ValueGrid::constant(GridShape::new(48, 64), 0.5)
    );
    assert_eq!(update.conflicts.len(), 3);
}

#[tokio::test]
async fn test_update_ignores_query_parameters_and_is_stable() {
    let app = disconnected_router();
    let (_, first) = get_json(app.clone(), "/api/v1/update").await;
    let (status, second) = get_json(app, "/api/v1/update?since=yesterday").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_update_rejects_post() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/update")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(disconnected_router(), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .uri("/api/v1/update")
        .header(header::ORIGIN, "http://dashboard.example")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(disconnected_router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/update")
        .header(header::ORIGIN, "http://dashboard.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(disconnected_router(), request).await;

    assert!(status.is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

// ============================================================================
// Health, readiness, metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(disconnected_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ready_reflects_session() {
    let (status, body) = get_json(disconnected_router(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
    assert_eq!(body["earth_engine"], "unavailable");

    let grid = ValueGrid::constant(GridShape::new(1, 1), 0.0);
    let (status, body) = get_json(router_with(Arc::new(StubSource(grid))), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, _, _) = send(disconnected_router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Moisture grid retrieval with a constant fallback.
//!
//! The remote fetch never fails the request: any error is logged and a
//! constant grid is served instead. The fallback takes the shape of the
//! last grid actually received, so the dashboard sees one shape whether or
//! not the remote call succeeded. Before any success it uses the configured
//! nominal shape.

use std::sync::Arc;
use std::time::Instant;

use aoi_common::{BoundingBox, GridShape, ValueGrid};
use async_trait::async_trait;
use earth_engine::{
    EarthEngineError, EarthEngineSession, EeResult, SessionConfig, WaterIndexQuery,
};
use metrics::{counter, histogram};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::FallbackConfig;

/// Somewhere a moisture grid can be fetched from.
#[async_trait]
pub trait MatrixSource: Send + Sync {
    async fn fetch(&self) -> EeResult<ValueGrid>;

    /// Whether the source finished its setup and can be queried.
    fn is_connected(&self) -> bool;
}

/// Earth Engine backed source. Holds no session when initialization failed;
/// every fetch then fails immediately.
pub struct EarthEngineSource {
    session: Option<EarthEngineSession>,
    query: WaterIndexQuery,
    aoi: BoundingBox,
}

impl EarthEngineSource {
    /// Open a session once. Failure is logged and not retried.
    pub async fn connect(
        config: &SessionConfig,
        query: WaterIndexQuery,
        aoi: BoundingBox,
    ) -> Self {
        let session = match EarthEngineSession::initialize(config).await {
            Ok(session) => {
                info!(project = %session.project(), "Satellite link connected");
                Some(session)
            }
            Err(e) => {
                error!(
                    project = %config.project,
                    error = %e,
                    "Earth Engine initialization failed; serving fallback grids"
                );
                None
            }
        };

        Self {
            session,
            query,
            aoi,
        }
    }

    pub fn disconnected(query: WaterIndexQuery, aoi: BoundingBox) -> Self {
        Self {
            session: None,
            query,
            aoi,
        }
    }

    pub fn with_session(
        session: EarthEngineSession,
        query: WaterIndexQuery,
        aoi: BoundingBox,
    ) -> Self {
        Self {
            session: Some(session),
            query,
            aoi,
        }
    }
}

#[async_trait]
impl MatrixSource for EarthEngineSource {
    async fn fetch(&self) -> EeResult<ValueGrid> {
        let session = self
            .session
            .as_ref()
            .ok_or(EarthEngineError::NotInitialized)?;
        session.sample_grid(&self.query, &self.aoi).await
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

/// Where a served grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOrigin {
    Remote,
    Fallback,
}

impl MatrixOrigin {
    fn as_label(&self) -> &'static str {
        match self {
            MatrixOrigin::Remote => "ok",
            MatrixOrigin::Fallback => "fallback",
        }
    }
}

/// Fetches grids from a source, substituting the fallback on failure.
pub struct SatelliteMatrix {
    source: Arc<dyn MatrixSource>,
    fallback_value: f64,
    nominal_shape: GridShape,
    last_shape: RwLock<Option<GridShape>>,
}

impl SatelliteMatrix {
    pub fn new(source: Arc<dyn MatrixSource>, fallback: &FallbackConfig) -> Self {
        Self {
            source,
            fallback_value: fallback.value,
            nominal_shape: fallback.shape(),
            last_shape: RwLock::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_connected()
    }

    /// Shape the next fallback grid will have.
    pub async fn fallback_shape(&self) -> GridShape {
        self.last_shape.read().await.unwrap_or(self.nominal_shape)
    }

    pub async fn fallback_grid(&self) -> ValueGrid {
        ValueGrid::constant(self.fallback_shape().await, self.fallback_value)
    }

    /// Fetch the current grid; never fails.
    pub async fn matrix(&self) -> (ValueGrid, MatrixOrigin) {
        let started = Instant::now();
        let result = self.source.fetch().await;
        histogram!("intel_matrix_fetch_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let (grid, origin) = match result {
            Ok(grid) => {
                let shape = grid.shape();
                let mut last = self.last_shape.write().await;
                if let Some(prev) = *last {
                    if prev != shape {
                        warn!(previous = %prev, current = %shape, "Remote grid shape changed");
                    }
                }
                *last = Some(shape);
                (grid, MatrixOrigin::Remote)
            }
            Err(e) => {
                if e.is_remote() {
                    error!(error = %e, "Matrix fetch failed");
                } else {
                    warn!("Matrix fetch skipped: {}", e);
                }
                (self.fallback_grid().await, MatrixOrigin::Fallback)
            }
        };

        counter!("intel_matrix_fetch_total", "outcome" => origin.as_label()).increment(1);
        (grid, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Serves a fixed grid until told to fail.
    struct ToggleSource {
        grid: ValueGrid,
        failing: AtomicBool,
    }

    #[async_trait]
    impl MatrixSource for ToggleSource {
        async fn fetch(&self) -> EeResult<ValueGrid> {
            if self.failing.load(Ordering::SeqCst) {
                Err(EarthEngineError::MalformedResult("down".to_string()))
            } else {
                Ok(self.grid.clone())
            }
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_disconnected_source_serves_nominal_fallback() {
        let source =
            EarthEngineSource::disconnected(WaterIndexQuery::default(), BoundingBox::default());
        assert!(!source.is_connected());

        let matrix = SatelliteMatrix::new(Arc::new(source), &FallbackConfig::default());
        let (grid, origin) = matrix.matrix().await;

        assert_eq!(origin, MatrixOrigin::Fallback);
        assert_eq!(grid, ValueGrid::constant(GridShape::new(48, 64), 0.5));
    }

    #[tokio::test]
    async fn test_fallback_follows_last_remote_shape() {
        let remote = ValueGrid::constant(GridShape::new(48, 47), 0.12);
        let source = Arc::new(ToggleSource {
            grid: remote.clone(),
            failing: AtomicBool::new(false),
        });
        let matrix = SatelliteMatrix::new(source.clone(), &FallbackConfig::default());

        let (grid, origin) = matrix.matrix().await;
        assert_eq!(origin, MatrixOrigin::Remote);
        assert_eq!(grid, remote);

        source.failing.store(true, Ordering::SeqCst);
        let (grid, origin) = matrix.matrix().await;
        assert_eq!(origin, MatrixOrigin::Fallback);
        assert_eq!(grid.shape(), GridShape::new(48, 47));
        assert_eq!(grid.get(0, 0), Some(0.5));
    }
}

//! Cattle-eye intel API server.
//!
//! Serves the dashboard update payload backed by Earth Engine.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aoi_common::{BoundingBox, GridShape};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use intel_api::config::IntelConfig;
use intel_api::satellite::EarthEngineSource;
use intel_api::state::AppState;

/// Intel API server
#[derive(Parser, Debug)]
#[command(name = "intel-api")]
#[command(about = "Satellite moisture grid and camp markers for the cattle-eye dashboard")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8000", env = "INTEL_LISTEN_ADDR")]
    listen: String,

    /// Configuration file
    #[arg(short, long, default_value = "config/intel.yaml", env = "INTEL_CONFIG")]
    config: PathBuf,

    /// Earth Engine cloud project (overrides the config file)
    #[arg(long, env = "EE_PROJECT")]
    project: Option<String>,

    /// Area of interest as "lon_min,lat_min,lon_max,lat_max" (overrides the config file)
    #[arg(long, env = "INTEL_AOI")]
    aoi: Option<String>,

    /// Pre-issued Earth Engine access token (skips stored credentials)
    #[arg(long, env = "EE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "INTEL_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting cattle-eye intel API");

    let mut config = IntelConfig::load(&args.config)?;
    if let Some(project) = &args.project {
        config.project_id = project.clone();
    }
    if let Some(aoi) = &args.aoi {
        config.aoi = BoundingBox::from_bbox_string(aoi).context("Invalid --aoi")?;
    }
    config.validate()?;

    let implied = GridShape::implied_by(&config.aoi, config.satellite.query.scale);
    let nominal = config.fallback.shape();
    if implied != nominal {
        warn!(
            fallback = %nominal,
            implied = %implied,
            "Fallback grid shape differs from the shape implied by aoi and scale"
        );
    }

    // Initialization failure is logged inside connect; the server runs
    // either way and serves fallback grids until restarted.
    let session_config = config.session_config(args.access_token.clone());
    let source = EarthEngineSource::connect(
        &session_config,
        config.satellite.query.clone(),
        config.aoi,
    )
    .await;

    let state =
        Arc::new(AppState::new(config, Arc::new(source)).with_prometheus(prometheus_handle));
    let app = intel_api::create_router(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Intel API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}

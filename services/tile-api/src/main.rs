//! Weather tile API service.
//!
//! Serves weather layers as slippy-map PNG tiles plus point and wind-vector
//! JSON for the map client.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tile_api::{build_router, AppState, Args, CacheSweeper, SweeperConfig, TileServerConfig};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        info!("Configuring tokio runtime with {} worker threads", threads);
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let config = TileServerConfig::load(args.config.as_deref())?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let state = Arc::new(
        AppState::new(config.clone())
            .await?
            .with_prometheus(prometheus_handle),
    );

    let sweeper = CacheSweeper::new(
        state.pipeline.store().clone(),
        SweeperConfig {
            interval: config.sweep_interval(),
            retention: config.stale_retention(),
        },
    )
    .spawn();

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", args.listen))?;
    info!(address = %addr, "Starting weather tile server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

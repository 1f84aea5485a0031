//! rinkorea-sw entry point.
//!
//! Boots the worker host: loads configuration, opens the cache registry,
//! registers the worker (install + activate) and serves HTTP until a
//! shutdown signal arrives. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rinkorea_client::{FetchClient, FetchConfig, ServiceWorker};
use rinkorea_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod routes;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "starting rinkorea-sw");

    let db = CacheDb::open(&config.db_path).await?;
    let upstream = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(ServiceWorker::new(db, upstream.clone(), &config)?);

    // Without a registered worker every request is forwarded untouched.
    if let Err(e) = worker.register().await {
        tracing::warn!(error = %e, "worker registration failed, serving pass-through only");
    }

    let state = state::AppState::new(worker, upstream, config.origin_url()?, config.max_bytes);
    let router = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}

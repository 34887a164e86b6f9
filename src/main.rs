use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use sloth_rest::api::create_router;
use sloth_rest::app::{AppConfig, AppState, Loader};
use sloth_rest::domain::KvStore;
use sloth_rest::domains;
use sloth_rest::infra::{MemoryKvStore, init_metrics_handle, init_tracing};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env win over the process environment
    dotenvy::dotenv_override().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format).context("failed to install tracing subscriber")?;

    info!(
        app = %config.app_name,
        environment = ?config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "REST API is starting"
    );

    let store = MemoryKvStore::open(SWEEP_INTERVAL);
    let port = config.port;
    let doc_path = config.doc_path.clone();
    let ui_path = config.ui_path.clone();

    let mut state = AppState::new(config, store.clone());
    match init_metrics_handle() {
        Some(handle) => state = state.with_metrics(handle),
        None => warn!("Prometheus recorder unavailable, metrics endpoint disabled"),
    }
    let state = Arc::new(state);

    let assembly = Loader::new(domains::registry())
        .load()
        .await
        .context("API assembly failed")?;
    let router = create_router(state, &assembly)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, doc = %doc_path, ui = %ui_path, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use battery_dashboard_api::app_state::build_app_state;
use battery_dashboard_api::core::client::influx_client::InfluxQueryExecutor;
use battery_dashboard_api::core::config::AppConfig;
use battery_dashboard_api::core::logging::init_tracing;
use battery_dashboard_api::domain::metric::query_builder::QueryBuilder;
use battery_dashboard_api::routes::app_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    let _log_guard = init_tracing();
    if !dotenv_loaded {
        warn!("No .env file loaded, relying on environment variables");
    }

    // Returning the error drops the log guard first, so file logs are flushed.
    let config = AppConfig::from_env().inspect_err(|err| {
        error!("Invalid InfluxDB configuration: {err}");
    })?;

    let executor = InfluxQueryExecutor::new(&config.influx)
        .context("Failed to initialize InfluxDB client")?;
    let builder = QueryBuilder::new(&config.influx.bucket, &config.influx.measurement);
    let state = build_app_state(Arc::new(executor), builder);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        bucket = %config.influx.bucket,
        org = %config.influx.org,
        "🚀 Serving on http://localhost:{}",
        config.port
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
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

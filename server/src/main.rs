//! Hostel booking HTTP server.

use hostel_core::environment::SystemClock;
use hostel_mpesa::DarajaClient;
use hostel_postgres::PostgresHostelStore;
use hostel_server::{
    auth::setup::bootstrap_admin,
    config::Config,
    metrics::register_business_metrics,
    server::{AppState, build_router},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostel_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hostel booking server");

    let config = Config::from_env();
    info!(
        server = %config.server_addr(),
        metrics = %config.metrics_addr(),
        mpesa = %config.mpesa.base_url,
        "Configuration loaded"
    );

    let metrics_addr: SocketAddr = config.metrics_addr().parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    register_business_metrics();
    info!(address = %metrics_addr, "Prometheus exporter listening");

    info!("Connecting to database...");
    let store = PostgresHostelStore::connect_with(&config.database.url, &config.database.pool())
        .await?;
    store.migrate().await?;
    info!("Database ready");

    let gateway = DarajaClient::new(config.mpesa.client_config())?;

    let state = AppState::new(
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(SystemClock),
        config.auth.session_ttl(),
    );
    bootstrap_admin(&state.auth, &config.auth).await?;

    let app = build_router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "HTTP server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    let drain = Duration::from_secs(config.server.shutdown_timeout);
    tokio::select! {
        result = &mut server => result?,
        Ok(()) = shutdown_rx.changed() => {
            match tokio::time::timeout(drain, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(timeout_secs = drain.as_secs(), "In-flight requests did not drain in time"),
            }
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

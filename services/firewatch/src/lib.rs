//! Firewatch - fire-alert telemetry monitoring service
//!
//! Polls a telemetry backend for sensor readings, folds them into bounded
//! fire sessions, persists the completed-session archive, and serves a
//! dashboard for live monitoring and reports.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod export;
pub mod io;
pub mod reading;
pub mod session;
pub mod state;
pub mod store;

pub use config::{load_config, Config};
pub use error::{FirewatchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::TelemetrySource;
use crate::engine::Engine;
use crate::io::ReqwestHttpClient;
use crate::store::{ArchiveStore, JsonFileStore};

/// Run the firewatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let cancel = CancellationToken::new();

    let source = Arc::new(TelemetrySource::new(&config.source, Arc::clone(&http)));
    let store: Arc<dyn ArchiveStore> = Arc::new(JsonFileStore::new(&config.archive_path));
    let state = state::new_state_handle(&config.aggregator, config.source.device_id.clone());

    let engine = Engine::new(
        Arc::clone(&source),
        Arc::clone(&store),
        &config,
        Arc::clone(&state),
        cancel.clone(),
    );

    // Seed the archive before the first poll
    engine.restore_archive().await;

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_state = Arc::clone(&state);
        let dashboard_store = Arc::clone(&store);
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_state, dashboard_store);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    tracing::info!("Firewatch engine started");

    // Run the poll loops (blocks until cancelled)
    engine.run().await;

    tracing::info!("Firewatch engine stopped");

    Ok(())
}

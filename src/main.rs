// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::connection_manager::ConnectionManager;
use crate::application::history_store::HistoryStore;
use crate::infrastructure::config::load_groundstation_config;
use crate::infrastructure::status_board::StatusBoard;
use crate::infrastructure::transport::build_transport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    connect, disconnect, export_csv, get_history, get_status, health_check, send_command,
    status_stream,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_groundstation_config()?;

    // Create transport (infrastructure layer)
    let transport = build_transport(&config.link);
    let status = Arc::new(StatusBoard::new());

    // Create services (application layer)
    let history = Arc::new(HistoryStore::new(config.telemetry.history_capacity));
    let manager = Arc::new(ConnectionManager::new(
        transport,
        history,
        status.clone(),
        config.connection_settings(),
    ));

    if config.link.auto_connect {
        if let Err(e) = manager.connect().await {
            tracing::error!(error = %e, "auto-connect failed, waiting for operator");
        }
    }

    // Create application state
    let state = Arc::new(AppState {
        manager: manager.clone(),
        status,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/status/stream", get(status_stream))
        .route("/history", get(get_history))
        .route("/export", get(export_csv))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/commands/:name", post(send_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, link = %manager.describe_transport(), "starting ground station console");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.disconnect().await;
    tracing::info!("ground station stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

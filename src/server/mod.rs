//! co2stream HTTP server
//!
//! This module provides the prediction service with:
//! - Emission predictions at `POST /predict`
//! - Health and load diagnostics at `/health`
//! - Cache management at `POST /cache/clear`
//! - Model diagnostics at `/model` and rating insights at `/insights`

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub mod gate;
pub mod lifecycle;
pub mod orchestrator;
pub mod result_cache;
pub mod routes;
pub mod state;

pub use gate::{AdmissionToken, ConcurrencyGate, GateTimeout};
pub use lifecycle::{ModelLifecycleManager, ModelState, Readiness};
pub use orchestrator::{PredictionResponse, RequestOrchestrator, ResponseStatus};
pub use result_cache::{ClearStats, ResultCache};
pub use state::ServerState;

/// Create the main application router
pub fn create_app(state: ServerState) -> Router {
    let timeout_duration = state.config.server.request_timeout();

    routes::create_router()
        .layer(TimeoutLayer::new(timeout_duration))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and run until ctrl-c
pub async fn start_server(addr: SocketAddr, state: ServerState) -> Result<()> {
    if state.config.server.warmup {
        state.lifecycle.spawn_warmup();
    }

    let app = create_app(state);

    info!("Starting co2stream server on {}", addr);
    info!("Predictions available at http://{}/predict", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! HTTP query server.
//!
//! Exposes the availability service as `GET /api/free-schedule` for the
//! browser front-end, which runs on a different origin.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::services::AvailabilityService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AvailabilityService>,
}

pub fn router(service: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route("/api/free-schedule", get(handlers::get_free_schedule))
        .route("/api/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, service: Arc<AvailabilityService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Shutdown signal received");
        })
        .await?;

    log::info!("Server stopped");
    Ok(())
}

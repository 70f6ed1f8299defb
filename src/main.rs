// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::config::load_server_config;
use crate::infrastructure::file_repository::FileRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_dashboard, get_data, get_sensor_stats, health_check, patch_entity, post_data,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_server_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(FileRepository::new(&config.store));

    // Create services (application layer)
    let dashboard_service = DashboardService::new(repository.clone());

    // Create application state
    let state = Arc::new(AppState {
        repository,
        dashboard_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/data/:entity_type/:entity_id", patch(patch_entity))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/sensors/:id/stats", get(get_sensor_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Starting retail-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

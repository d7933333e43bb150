//! # TaskFlow API Server
//!
//! This is the main API server for TaskFlow, providing REST endpoints for
//! clients, tasks, the daily planner, dashboard rollups, and live change
//! events.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Authentication (email/password + Google sign-in, session cookie or Bearer JWT)
//! - Per-user CRUD over clients, tasks, schedule items, and settings
//! - Dashboard statistics and revenue series
//! - SSE change feed for live UI updates
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskflow-api
//! ```

use taskflow_api::app::{build_router, AppState};
use taskflow_api::config::Config;
use taskflow_shared::db::migrations::run_migrations;
use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskFlow API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves when the process receives a shutdown request
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

/// Health check endpoint
///
/// Verifies that the server is running and can reach its database.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status ("connected" or "disconnected")
    pub database: String,
}

/// Health check handler
///
/// Runs a trivial query against the pool; a failure downgrades the service
/// status rather than erroring, so load balancers always get a body.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();

    Ok(Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        version: taskflow_shared::VERSION.to_string(),
        database: if database_ok {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
    }))
}

/// Dashboard endpoints
///
/// Aggregated analytics computed live by SQL rather than read from the
/// denormalized client counters, so the dashboard reflects the tasks table
/// even if a counter ever drifted.
///
/// # Endpoints
///
/// - `GET /v1/dashboard/stats` - Headline numbers
/// - `GET /v1/dashboard/revenue` - Revenue chart series
/// - `GET /v1/dashboard/upcoming` - Open tasks with the nearest due dates

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::stats::{
        revenue_series, upcoming_due_tasks, DashboardStats, DueSoonTask, RevenueGranularity,
        RevenuePoint,
    },
};

/// Default and maximum sizes of the upcoming-tasks list
const DEFAULT_UPCOMING_LIMIT: i64 = 5;
const MAX_UPCOMING_LIMIT: i64 = 50;

/// Revenue chart query
#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    /// Bucket granularity; defaults to weekly
    pub granularity: Option<RevenueGranularity>,
}

/// Revenue chart response
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    /// The granularity the series was computed at
    pub granularity: RevenueGranularity,

    /// Zero-filled buckets, oldest first (7 daily or 12 monthly)
    pub points: Vec<RevenuePoint>,
}

/// Upcoming tasks query
#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Maximum number of tasks to return (default 5, capped at 50)
    pub limit: Option<i64>,
}

/// Upcoming tasks response
#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    /// Open tasks with due dates, soonest first
    pub tasks: Vec<DueSoonTask>,
}

/// Headline dashboard numbers
///
/// Task counts (total, active, open, completed), client count, tracked
/// hours, and total plus current-month revenue. "Open" means not done with
/// hours already tracked against it.
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardStats>> {
    let stats = DashboardStats::compute(&state.db, auth.user_id).await?;

    Ok(Json(stats))
}

/// Revenue chart series
///
/// `?granularity=weekly` buckets the trailing seven days, one point per day;
/// `?granularity=monthly` buckets the trailing twelve months. Buckets are
/// zero-filled so the chart always gets a full series.
pub async fn revenue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Json<RevenueResponse>> {
    let granularity = query.granularity.unwrap_or(RevenueGranularity::Weekly);
    let points = revenue_series(&state.db, auth.user_id, granularity).await?;

    Ok(Json(RevenueResponse {
        granularity,
        points,
    }))
}

/// Open tasks with the nearest due dates, soonest first
pub async fn upcoming(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Json<UpcomingResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, MAX_UPCOMING_LIMIT);

    let tasks = upcoming_due_tasks(&state.db, auth.user_id, limit).await?;

    Ok(Json(UpcomingResponse { tasks }))
}

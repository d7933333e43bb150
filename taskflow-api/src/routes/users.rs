/// Admin account listing
///
/// The one endpoint gated on role rather than ownership: admins can page
/// through every account. Regular users get 403.
///
/// # Endpoint
///
/// ```text
/// GET /v1/users?limit=50&offset=0
/// Authorization: Bearer <admin jwt>
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::UserResponse,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskflow_shared::{auth::middleware::AuthContext, models::user::User};

/// Default and maximum page sizes
const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// List users query
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Page size (default 50, capped at 200)
    pub limit: Option<i64>,

    /// Rows to skip
    pub offset: Option<i64>,
}

/// List users response
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    /// One page of accounts, newest first
    pub users: Vec<UserResponse>,

    /// Total number of accounts
    pub total: i64,
}

/// List all accounts (admin only)
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<ListUsersResponse>> {
    if !auth.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let users = User::list(&state.db, limit, offset).await?;
    let total = User::count(&state.db).await?;

    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
    }))
}

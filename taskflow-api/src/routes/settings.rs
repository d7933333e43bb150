/// Settings endpoints
///
/// Per-user settings (display currency) and the recurring weekly
/// availability windows the planner shades working hours from.
///
/// # Endpoints
///
/// - `GET /v1/settings` - Currency and availability windows
/// - `PUT /v1/settings` - Update the display currency
/// - `POST /v1/settings/availability` - Add a weekly availability window
/// - `DELETE /v1/settings/availability/:id` - Remove a window

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::middleware::AuthContext,
    events::{ChangeAction, ChangeEvent, EntityKind},
    models::settings::{AvailabilityWindow, CreateAvailabilityWindow, Settings},
};
use uuid::Uuid;

/// Settings response: the currency plus every availability window
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// Display currency (ISO 4217 code)
    pub currency: String,

    /// Recurring weekly availability windows, earliest start first
    pub availability: Vec<AvailabilityWindow>,
}

/// Currency update request
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// New display currency (three uppercase letters)
    pub currency: String,
}

/// Delete availability window response
#[derive(Debug, Serialize)]
pub struct DeleteAvailabilityResponse {
    /// Whether the window was deleted
    pub deleted: bool,
}

/// The caller's settings
///
/// Creates the default settings row on first read, so this never 404s.
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SettingsResponse>> {
    let settings = Settings::get_or_create(&state.db, auth.user_id).await?;
    let availability = AvailabilityWindow::list(&state.db, auth.user_id).await?;

    Ok(Json(SettingsResponse {
        currency: settings.currency,
        availability,
    }))
}

/// Update the display currency
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Not a three-letter uppercase code
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Settings>> {
    if !is_currency_code(&req.currency) {
        return Err(ApiError::invalid_field(
            "currency",
            "Currency must be a 3-letter uppercase code",
        ));
    }

    let settings = Settings::update_currency(&state.db, auth.user_id, &req.currency).await?;

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Settings,
        ChangeAction::Updated,
        auth.user_id,
    ));

    Ok(Json(settings))
}

/// Add a weekly availability window
///
/// # Endpoint
///
/// ```text
/// POST /v1/settings/availability
/// Content-Type: application/json
///
/// {
///   "weekdays": [1, 2, 3, 4, 5],
///   "start_time": "09:00:00",
///   "end_time": "17:30:00"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Empty or out-of-range weekdays, or
///   start not before end
pub async fn add_availability(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateAvailabilityWindow>,
) -> ApiResult<Json<AvailabilityWindow>> {
    if req.weekdays.is_empty() {
        return Err(ApiError::invalid_field(
            "weekdays",
            "At least one weekday is required",
        ));
    }
    if req.weekdays.iter().any(|day| !(1..=7).contains(day)) {
        return Err(ApiError::invalid_field(
            "weekdays",
            "Weekdays must be between 1 (Monday) and 7 (Sunday)",
        ));
    }
    if req.start_time >= req.end_time {
        return Err(ApiError::invalid_field(
            "start_time",
            "Start time must be before end time",
        ));
    }

    // Store a canonical weekday set
    let mut weekdays = req.weekdays;
    weekdays.sort_unstable();
    weekdays.dedup();

    let window = AvailabilityWindow::create(
        &state.db,
        auth.user_id,
        CreateAvailabilityWindow {
            weekdays,
            start_time: req.start_time,
            end_time: req.end_time,
        },
    )
    .await?;

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Settings,
        ChangeAction::Created,
        window.id,
    ));

    Ok(Json(window))
}

/// Remove an availability window
///
/// # Errors
///
/// - `404 Not Found`: No such window for this user
pub async fn delete_availability(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteAvailabilityResponse>> {
    let deleted = AvailabilityWindow::delete(&state.db, auth.user_id, id).await?;

    if !deleted {
        return Err(ApiError::NotFound(
            "Availability window not found".to_string(),
        ));
    }

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Settings,
        ChangeAction::Deleted,
        id,
    ));

    Ok(Json(DeleteAvailabilityResponse { deleted }))
}

/// Three ASCII uppercase letters, the shape of an ISO 4217 code
fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Daily planner endpoints
///
/// The planner pins tasks to fixed half-hour slots on a calendar day. Slot
/// occupancy is enforced by a database uniqueness constraint over
/// (user, day, slot), so two requests racing for the same slot cannot both
/// win; the loser gets a conflict. Locked items refuse moves and deletes
/// until unlocked.
///
/// # Endpoints
///
/// - `GET /v1/planner/day/:date` - One day's schedule with availability
/// - `POST /v1/planner/items` - Pin a task to a slot
/// - `PATCH /v1/planner/items/:id` - Move an item or toggle its lock
/// - `DELETE /v1/planner/items/:id` - Unpin an item
/// - `PATCH /v1/planner/items/:id/duration` - Edit the task's duration

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::middleware::AuthContext,
    events::{ChangeAction, ChangeEvent, EntityKind},
    models::{
        schedule::{is_slot_boundary, CreateScheduleItem, ScheduleItem, ScheduleItemDetail},
        settings::AvailabilityWindow,
        task::{Task, UpdateTask},
    },
};
use uuid::Uuid;

/// One planner day: its slot assignments and the availability windows
/// covering that weekday
#[derive(Debug, Serialize)]
pub struct PlannerDayResponse {
    /// The requested day
    pub day: NaiveDate,

    /// Slot assignments joined with their tasks, in slot order
    pub items: Vec<ScheduleItemDetail>,

    /// Recurring availability windows covering this ISO weekday
    pub availability: Vec<AvailabilityWindow>,
}

/// Move/lock request for a schedule item
///
/// `day` and `slot` move the item (omitted halves keep their current value);
/// `locked` toggles the lock. Locked items must be unlocked before moving.
#[derive(Debug, Deserialize)]
pub struct UpdateScheduleItemRequest {
    pub day: Option<NaiveDate>,
    pub slot: Option<NaiveTime>,
    pub locked: Option<bool>,
}

/// Duration edit request
#[derive(Debug, Deserialize)]
pub struct EditDurationRequest {
    /// New estimated duration in minutes
    pub estimated_duration: i32,
}

/// Delete schedule item response
#[derive(Debug, Serialize)]
pub struct DeleteScheduleItemResponse {
    /// Whether the item was deleted
    pub deleted: bool,
}

/// One day's schedule
///
/// Returns the day's slot assignments joined with their tasks, plus the
/// availability windows whose weekday set covers the day, so the UI can
/// shade working hours.
pub async fn day_view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<PlannerDayResponse>> {
    let items = ScheduleItem::list_for_day(&state.db, auth.user_id, date).await?;

    let weekday = date.weekday().number_from_monday() as i16;
    let availability =
        AvailabilityWindow::list_for_weekday(&state.db, auth.user_id, weekday).await?;

    Ok(Json(PlannerDayResponse {
        day: date,
        items,
        availability,
    }))
}

/// Pin a task to a slot
///
/// # Endpoint
///
/// ```text
/// POST /v1/planner/items
/// Content-Type: application/json
///
/// {
///   "task_id": "uuid",
///   "day": "2025-04-14",
///   "slot": "09:30:00"
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Task not found for this user
/// - `409 Conflict`: The slot is already taken
/// - `422 Unprocessable Entity`: Slot is not on a half-hour boundary
pub async fn create_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateScheduleItem>,
) -> ApiResult<Json<ScheduleItem>> {
    if !is_slot_boundary(req.slot) {
        return Err(ApiError::invalid_field(
            "slot",
            "Slot must sit on a half-hour boundary",
        ));
    }

    // The foreign key alone would accept another user's task
    Task::find_by_id(&state.db, auth.user_id, req.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let item = ScheduleItem::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, item_id = %item.id, "schedule item created");
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Schedule,
        ChangeAction::Created,
        item.id,
    ));

    Ok(Json(item))
}

/// Move a schedule item or toggle its lock
///
/// # Errors
///
/// - `404 Not Found`: No such item for this user
/// - `409 Conflict`: Item is locked, or the target slot is taken
/// - `422 Unprocessable Entity`: Target slot is not on a half-hour boundary
pub async fn update_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateScheduleItemRequest>,
) -> ApiResult<Json<ScheduleItem>> {
    let mut item = ScheduleItem::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule item not found".to_string()))?;

    let moving = req.day.is_some() || req.slot.is_some();

    if moving {
        if item.locked {
            return Err(ApiError::Conflict("Schedule item is locked".to_string()));
        }

        let day = req.day.unwrap_or(item.day);
        let slot = req.slot.unwrap_or(item.slot);

        if !is_slot_boundary(slot) {
            return Err(ApiError::invalid_field(
                "slot",
                "Slot must sit on a half-hour boundary",
            ));
        }

        item = ScheduleItem::move_to(&state.db, auth.user_id, id, day, slot)
            .await?
            .ok_or_else(|| ApiError::NotFound("Schedule item not found".to_string()))?;
    }

    if let Some(locked) = req.locked {
        item = ScheduleItem::set_locked(&state.db, auth.user_id, id, locked)
            .await?
            .ok_or_else(|| ApiError::NotFound("Schedule item not found".to_string()))?;
    }

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Schedule,
        ChangeAction::Updated,
        item.id,
    ));

    Ok(Json(item))
}

/// Unpin an item from the planner
///
/// # Errors
///
/// - `404 Not Found`: No such item for this user
/// - `409 Conflict`: Item is locked
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteScheduleItemResponse>> {
    let item = ScheduleItem::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule item not found".to_string()))?;

    if item.locked {
        return Err(ApiError::Conflict("Schedule item is locked".to_string()));
    }

    let deleted = ScheduleItem::delete(&state.db, auth.user_id, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Schedule item not found".to_string()));
    }

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Schedule,
        ChangeAction::Deleted,
        id,
    ));

    Ok(Json(DeleteScheduleItemResponse { deleted }))
}

/// Edit the estimated duration of the task behind a schedule item
///
/// This is the planner's inline duration edit; it writes through to the
/// task, so the change shows everywhere the task does.
///
/// # Errors
///
/// - `404 Not Found`: No such item for this user
/// - `422 Unprocessable Entity`: Non-positive duration
pub async fn edit_duration(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<EditDurationRequest>,
) -> ApiResult<Json<Task>> {
    if req.estimated_duration < 1 {
        return Err(ApiError::invalid_field(
            "estimated_duration",
            "Estimated duration must be positive",
        ));
    }

    let item = ScheduleItem::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule item not found".to_string()))?;

    let task = Task::update(
        &state.db,
        auth.user_id,
        item.task_id,
        UpdateTask {
            estimated_duration: Some(req.estimated_duration),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Tasks,
        ChangeAction::Updated,
        task.id,
    ));

    Ok(Json(task))
}

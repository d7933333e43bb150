/// Task management endpoints
///
/// Task CRUD plus the two operations with real machinery behind them: status
/// transitions (which run the transactional revenue rollup against the
/// owning client) and dependency-edge replacement (which re-validates the
/// caller's dependency graph before writing).
///
/// # Endpoints
///
/// - `POST /v1/tasks` - Create task
/// - `GET /v1/tasks` - List tasks (filterable)
/// - `GET /v1/tasks/:id` - Fetch one task with its edges and slots
/// - `PATCH /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Delete task
/// - `POST /v1/tasks/:id/status` - Transition status
/// - `PUT /v1/tasks/:id/blocked-by` - Replace the dependency list

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use taskflow_shared::{
    auth::middleware::AuthContext,
    events::{ChangeAction, ChangeEvent, EntityKind},
    models::task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
};
use uuid::Uuid;
use validator::Validate;

/// List tasks response
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    /// Matching tasks, newest first
    pub tasks: Vec<Task>,
}

/// Task list filters, all optional
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    /// Filter by status (`todo`, `in-progress`, `done`)
    pub status: Option<TaskStatus>,

    /// Filter by client
    pub client_id: Option<Uuid>,

    /// Only tasks due on or before this date
    pub due_before: Option<NaiveDate>,
}

/// A task joined with its dependency edges and planner slots
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    /// The task itself, flattened into the top level
    #[serde(flatten)]
    pub task: Task,

    /// IDs of the tasks blocking this one
    pub blocked_by: Vec<Uuid>,

    /// IDs of the planner slots this task occupies
    pub schedules: Vec<Uuid>,
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Target status
    pub status: TaskStatus,
}

/// Dependency replacement request
#[derive(Debug, Deserialize)]
pub struct SetBlockedByRequest {
    /// The complete new set of blocking task IDs
    pub blocked_by: Vec<Uuid>,
}

/// Delete task response
#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    /// Whether the task was deleted
    pub deleted: bool,
}

/// Create a task
///
/// The client must belong to the caller; its `active_tasks` counter is
/// incremented in the same transaction. Any `blocked_by` IDs are validated
/// against the caller's tasks.
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks
/// Content-Type: application/json
///
/// {
///   "client_id": "uuid",
///   "title": "Quarterly VAT filing",
///   "estimated_duration": 90,
///   "due_date": "2025-04-30",
///   "blocked_by": []
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Client not found for this user
/// - `422 Unprocessable Entity`: Validation failed or unknown blocking task
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTask>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = Task::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, task_id = %task.id, "task created");
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Tasks,
        ChangeAction::Created,
        task.id,
    ));
    // Counter moved on the client row too
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Updated,
        task.client_id,
    ));

    Ok(Json(task))
}

/// List the caller's tasks, newest first
///
/// Accepts `?status=`, `?client_id=`, and `?due_before=` filters, combined
/// with AND.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = Task::list(
        &state.db,
        auth.user_id,
        TaskFilter {
            status: query.status,
            client_id: query.client_id,
            due_before: query.due_before,
        },
    )
    .await?;

    Ok(Json(ListTasksResponse { tasks }))
}

/// Fetch one task with its dependency edges and planner slots
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let detail = task_detail(&state.db, auth.user_id, id).await?;

    Ok(Json(detail))
}

/// Partially update a task
///
/// Covers the descriptive and scheduling fields plus `tracked_hours`.
/// Status is not accepted here; transitions go through the status endpoint
/// so the client counters stay consistent.
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = Task::update(&state.db, auth.user_id, id, req)
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

/// Delete a task
///
/// Rolls the task's contribution out of the client counters; dependency
/// edges and schedule items cascade away with it.
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let task = Task::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let deleted = Task::delete(&state.db, auth.user_id, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, task_id = %id, "task deleted");
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Tasks,
        ChangeAction::Deleted,
        id,
    ));
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Updated,
        task.client_id,
    ));

    Ok(Json(DeleteTaskResponse { deleted }))
}

/// Transition a task's status
///
/// Entering `done` captures `hourly_rate * tracked_hours` as revenue and
/// rolls it into the client counters; leaving `done` reverses exactly that
/// amount. Both run in one transaction with atomic increments. Re-sending
/// the current status is a no-op.
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks/:id/status
/// Content-Type: application/json
///
/// { "status": "done" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
pub async fn set_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<Task>> {
    let task = Task::set_status(&state.db, auth.user_id, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(
        user_id = %auth.user_id,
        task_id = %task.id,
        status = task.status.as_str(),
        "task status changed"
    );
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Tasks,
        ChangeAction::Updated,
        task.id,
    ));
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Updated,
        task.client_id,
    ));

    Ok(Json(task))
}

/// Replace the set of tasks blocking this one
///
/// The whole new edge set is validated inside the writing transaction:
/// self-references, unknown tasks, and anything that would close a cycle in
/// the caller's dependency graph are rejected without changing the stored
/// edges.
///
/// # Endpoint
///
/// ```text
/// PUT /v1/tasks/:id/blocked-by
/// Content-Type: application/json
///
/// { "blocked_by": ["uuid", "uuid"] }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
/// - `422 Unprocessable Entity`: Self-reference, unknown task, or cycle
pub async fn set_blocked_by(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetBlockedByRequest>,
) -> ApiResult<Json<TaskDetail>> {
    Task::set_blocked_by(&state.db, auth.user_id, id, req.blocked_by)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Tasks,
        ChangeAction::Updated,
        id,
    ));

    let detail = task_detail(&state.db, auth.user_id, id).await?;

    Ok(Json(detail))
}

/// Loads a task together with its dependency edges and planner slots
async fn task_detail(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<TaskDetail, ApiError> {
    let task = Task::find_by_id(db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let blocked_by = Task::blocked_by_ids(db, task.id).await?;
    let schedules = Task::schedule_ids(db, task.id).await?;

    Ok(TaskDetail {
        task,
        blocked_by,
        schedules,
    })
}

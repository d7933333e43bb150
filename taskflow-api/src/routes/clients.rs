/// Client management endpoints
///
/// CRUD over the caller's clients plus two read-side extras: the client's
/// task list and live per-client analytics. All queries are scoped to the
/// authenticated user; other users' clients are indistinguishable from
/// missing ones (404).
///
/// # Endpoints
///
/// - `POST /v1/clients` - Create client
/// - `GET /v1/clients` - List clients
/// - `GET /v1/clients/:id` - Fetch one client
/// - `PATCH /v1/clients/:id` - Partial update
/// - `DELETE /v1/clients/:id` - Delete client and its tasks
/// - `GET /v1/clients/:id/tasks` - The client's tasks
/// - `GET /v1/clients/:id/stats` - Per-client analytics

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::tasks::ListTasksResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use taskflow_shared::{
    auth::middleware::AuthContext,
    events::{ChangeAction, ChangeEvent, EntityKind},
    models::{
        client::{Client, ClientStats, CreateClient, UpdateClient},
        task::{Task, TaskFilter},
    },
};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

/// List clients response
#[derive(Debug, Serialize)]
pub struct ListClientsResponse {
    /// The caller's clients, newest first
    pub clients: Vec<Client>,
}

/// Delete client response
#[derive(Debug, Serialize)]
pub struct DeleteClientResponse {
    /// Whether the client was deleted
    pub deleted: bool,
}

/// Create a client
///
/// # Endpoint
///
/// ```text
/// POST /v1/clients
/// Content-Type: application/json
///
/// {
///   "name": "Acme Corp",
///   "email": "billing@acme.example",
///   "currency": "EUR",
///   "hourly_rate": 85.0
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid credentials
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateClient>,
) -> ApiResult<Json<Client>> {
    req.validate()?;

    let client = Client::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, client_id = %client.id, "client created");
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Created,
        client.id,
    ));

    Ok(Json(client))
}

/// List the caller's clients, newest first
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListClientsResponse>> {
    let clients = Client::list(&state.db, auth.user_id).await?;

    Ok(Json(ListClientsResponse { clients }))
}

/// Fetch one client
///
/// # Errors
///
/// - `404 Not Found`: No such client for this user
pub async fn get_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    let client = Client::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    Ok(Json(client))
}

/// Partially update a client
///
/// Accepts any subset of the identity and billing fields; nullable fields
/// can be cleared by sending `null`. The task counters and revenue total are
/// never writable here.
///
/// # Errors
///
/// - `404 Not Found`: No such client for this user
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClient>,
) -> ApiResult<Json<Client>> {
    req.validate()?;
    validate_clearable_fields(&req)?;

    let client = Client::update(&state.db, auth.user_id, id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Updated,
        client.id,
    ));

    Ok(Json(client))
}

/// Delete a client
///
/// The client's tasks, their dependency edges, and their schedule items all
/// go with it in the same cascading statement.
///
/// # Errors
///
/// - `404 Not Found`: No such client for this user
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteClientResponse>> {
    let deleted = Client::delete(&state.db, auth.user_id, id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, client_id = %id, "client deleted");
    state.events.publish(ChangeEvent::new(
        auth.user_id,
        EntityKind::Clients,
        ChangeAction::Deleted,
        id,
    ));

    Ok(Json(DeleteClientResponse { deleted }))
}

/// The client's tasks, newest first
///
/// # Errors
///
/// - `404 Not Found`: No such client for this user
pub async fn client_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListTasksResponse>> {
    Client::find_by_id(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    let tasks = Task::list(
        &state.db,
        auth.user_id,
        TaskFilter {
            client_id: Some(id),
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(ListTasksResponse { tasks }))
}

/// Checks the clearable fields, which hide their values from the derive
/// behind a second Option layer
fn validate_clearable_fields(req: &UpdateClient) -> Result<(), ApiError> {
    if let Some(Some(email)) = &req.email {
        if !email.validate_email() {
            return Err(ApiError::invalid_field("email", "Invalid email format"));
        }
    }
    if let Some(Some(currency)) = &req.currency {
        if currency.len() != 3 {
            return Err(ApiError::invalid_field(
                "currency",
                "Currency must be a 3-letter code",
            ));
        }
    }
    if let Some(Some(rate)) = req.hourly_rate {
        if rate < 0.0 {
            return Err(ApiError::invalid_field(
                "hourly_rate",
                "Hourly rate cannot be negative",
            ));
        }
    }
    if let Some(Some(wage)) = req.monthly_wage {
        if wage < 0.0 {
            return Err(ApiError::invalid_field(
                "monthly_wage",
                "Monthly wage cannot be negative",
            ));
        }
    }

    Ok(())
}

/// Per-client analytics
///
/// Task totals by status, tracked hours, and total plus current-month
/// revenue, computed live from the tasks table.
///
/// # Errors
///
/// - `404 Not Found`: No such client for this user
pub async fn client_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClientStats>> {
    let stats = Client::stats(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    Ok(Json(stats))
}

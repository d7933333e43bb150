/// Task model and database operations
///
/// Tasks are the core entity of TaskFlow. Each one belongs to a user and a
/// client, carries scheduling fields consumed by the daily planner, and feeds
/// the revenue rollup when it is marked done.
///
/// # Status machine
///
/// ```text
/// todo ↔ in-progress
/// todo ↔ done
/// in-progress ↔ done
/// ```
///
/// Any status can move to any other. What matters is the edge into and out of
/// `done`: completing a task captures `hourly_rate * tracked_hours` as its
/// revenue and rolls it into the client counters, reopening reverses that
/// contribution. Both sides run as atomic increments inside one transaction so
/// concurrent completions against the same client cannot lose updates.
///
/// # Dependencies
///
/// A task may be blocked by other tasks of the same user. The edges live in
/// `task_dependencies` and must stay acyclic; [`Task::set_blocked_by`]
/// re-checks the whole per-user graph inside the writing transaction and
/// rejects any edge set that would close a cycle.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     estimated_duration INTEGER NOT NULL,
///     due_date DATE,
///     start_date DATE,
///     start_time TIME,
///     end_date DATE,
///     end_time TIME,
///     tracked_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
///     revenue DOUBLE PRECISION NOT NULL DEFAULT 0,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_dependencies (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     blocked_by UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, blocked_by)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::task::{Task, CreateTask, TaskStatus};
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid, client_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, user_id, CreateTask {
///     client_id,
///     title: "Quarterly VAT filing".to_string(),
///     description: None,
///     estimated_duration: 90,
///     due_date: None,
///     start_date: None,
///     start_time: None,
///     end_date: None,
///     end_time: None,
///     blocked_by: vec![],
/// }).await?;
///
/// // Completing it rolls revenue up into the client
/// Task::set_status(&pool, user_id, task.id, TaskStatus::Done).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::double_option;

/// Task status
///
/// Stored as the `task_status` Postgres enum; serialized in kebab-case on the
/// wire (`"in-progress"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    Todo,

    /// Being worked on
    InProgress,

    /// Finished; revenue has been captured
    Done,
}

impl TaskStatus {
    /// Converts status to its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    /// Parses status from its wire string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in-progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// Checks whether the status counts toward completed work
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

/// Error surface for dependency-edge writes
///
/// Everything except `Database` is a graph-validation failure the API maps to
/// an unprocessable-entity response.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// A task cannot block itself
    #[error("a task cannot block itself")]
    SelfReference,

    /// The requested edges would close a cycle in the dependency graph
    #[error("dependencies would form a cycle")]
    Cycle,

    /// A referenced blocking task does not exist for this user
    #[error("blocking task {0} not found")]
    UnknownTask(Uuid),

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Client this task is billed against
    pub client_id: Uuid,

    /// Short title shown in lists and the planner
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Estimated effort in minutes
    pub estimated_duration: i32,

    /// Due date, if any
    pub due_date: Option<NaiveDate>,

    /// Optional working window: first day
    pub start_date: Option<NaiveDate>,

    /// Optional working window: start of day time
    pub start_time: Option<NaiveTime>,

    /// Optional working window: last day
    pub end_date: Option<NaiveDate>,

    /// Optional working window: end of day time
    pub end_time: Option<NaiveTime>,

    /// Hours actually tracked against this task
    pub tracked_hours: f64,

    /// Revenue captured when the task was marked done (0 while open)
    pub revenue: f64,

    /// When the task was marked done (None while open)
    pub completed_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
///
/// New tasks always start in `todo` with zero tracked hours.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    /// Client the task is billed against
    pub client_id: Uuid,

    /// Task title
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Estimated effort in minutes
    #[validate(range(min = 1, message = "Estimated duration must be positive"))]
    pub estimated_duration: i32,

    /// Due date
    pub due_date: Option<NaiveDate>,

    /// Working window fields
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,

    /// IDs of tasks that must finish first
    #[serde(default)]
    pub blocked_by: Vec<Uuid>,
}

/// Input for updating a task
///
/// All fields are optional; nullable columns take a nested Option so an
/// absent field leaves the column alone while an explicit null clears it.
/// Status is deliberately absent here because status changes must go through
/// [`Task::set_status`] to keep the client counters consistent. Editing
/// `tracked_hours` on a task that is already done does not recompute its
/// captured revenue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[validate(range(min = 1, message = "Estimated duration must be positive"))]
    pub estimated_duration: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<NaiveTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<NaiveTime>>,
    #[validate(range(min = 0.0, message = "Tracked hours cannot be negative"))]
    pub tracked_hours: Option<f64>,
}

/// Optional filters for [`Task::list`]
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub client_id: Option<Uuid>,
    pub due_before: Option<NaiveDate>,
}

impl Task {
    /// Creates a new task and bumps the client's active counter
    ///
    /// Runs in one transaction: the client row is locked and verified to
    /// belong to `user_id`, the task is inserted, `active_tasks` is
    /// incremented, and any `blocked_by` edges are validated and written.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyError::UnknownTask`] if a blocking ID does not
    /// exist for this user, and [`DependencyError::Database`] wrapping
    /// `RowNotFound` if the client does not exist for this user.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, DependencyError> {
        let mut tx = pool.begin().await?;

        // Lock the client row so the counter increment cannot race a delete
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM clients WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(data.client_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let blocked_by = dedupe_ids(&data.blocked_by);
        verify_tasks_exist(&mut tx, user_id, &blocked_by).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, client_id, title, description, estimated_duration,
                               due_date, start_date, start_time, end_date, end_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, client_id, title, description, status, estimated_duration,
                      due_date, start_date, start_time, end_date, end_time,
                      tracked_hours, revenue, completed_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.client_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.estimated_duration)
        .bind(data.due_date)
        .bind(data.start_date)
        .bind(data.start_time)
        .bind(data.end_date)
        .bind(data.end_time)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE clients
            SET active_tasks = active_tasks + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(data.client_id)
        .execute(&mut *tx)
        .await?;

        // A brand-new task has no inbound edges, so these cannot close a cycle
        if !blocked_by.is_empty() {
            insert_dependency_edges(&mut tx, task.id, &blocked_by).await?;
        }

        tx.commit().await?;

        Ok(task)
    }

    /// Finds a task by ID, scoped to its owning user
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, client_id, title, description, status, estimated_duration,
                   due_date, start_date, start_time, end_date, end_time,
                   tracked_hours, revenue, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks for `user_id` with optional filters, newest first
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        filter: TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = String::from(
            "SELECT id, user_id, client_id, title, description, status, estimated_duration, \
             due_date, start_date, start_time, end_date, end_time, \
             tracked_hours, revenue, completed_at, created_at, updated_at \
             FROM tasks WHERE user_id = $1",
        );
        let mut bind_count = 1;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.client_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND client_id = ${}", bind_count));
        }
        if filter.due_before.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND due_date <= ${}", bind_count));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(client_id) = filter.client_id {
            q = q.bind(client_id);
        }
        if let Some(due_before) = filter.due_before {
            q = q.bind(due_before);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Updates descriptive and scheduling fields of a task
    ///
    /// Only non-None fields in `data` are written; see [`UpdateTask`] for the
    /// clearing semantics. Status is not touched here.
    ///
    /// # Returns
    ///
    /// The updated task if found, None if it doesn't exist for this user
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.estimated_duration.is_some() {
            bind_count += 1;
            query.push_str(&format!(", estimated_duration = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.start_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_date = ${}", bind_count));
        }
        if data.start_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_time = ${}", bind_count));
        }
        if data.end_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_date = ${}", bind_count));
        }
        if data.end_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_time = ${}", bind_count));
        }
        if data.tracked_hours.is_some() {
            bind_count += 1;
            query.push_str(&format!(", tracked_hours = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, client_id, title, description, status, estimated_duration, \
             due_date, start_date, start_time, end_date, end_time, \
             tracked_hours, revenue, completed_at, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(user_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(estimated_duration) = data.estimated_duration {
            q = q.bind(estimated_duration);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(start_time) = data.start_time {
            q = q.bind(start_time);
        }
        if let Some(end_date) = data.end_date {
            q = q.bind(end_date);
        }
        if let Some(end_time) = data.end_time {
            q = q.bind(end_time);
        }
        if let Some(tracked_hours) = data.tracked_hours {
            q = q.bind(tracked_hours);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Moves a task to a new status, keeping the client counters consistent
    ///
    /// The task row is locked for the duration of the transaction. Entering
    /// `done` captures `hourly_rate * tracked_hours` as the task's revenue,
    /// stamps `completed_at`, and applies `active_tasks - 1`,
    /// `completed_tasks + 1`, `total_revenue + revenue` to the client. Leaving
    /// `done` reverses exactly the revenue that was captured, not a
    /// recomputed figure. All counter changes are relative increments so
    /// concurrent transitions against the same client serialize correctly.
    ///
    /// Setting the current status again is a no-op.
    ///
    /// # Returns
    ///
    /// The updated task if found, None if it doesn't exist for this user
    pub async fn set_status(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(task) = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, client_id, title, description, status, estimated_duration,
                   due_date, start_date, start_time, end_date, end_time,
                   tracked_hours, revenue, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        if task.status == status {
            tx.commit().await?;
            return Ok(Some(task));
        }

        let updated = match (task.status, status) {
            (_, TaskStatus::Done) => {
                let (hourly_rate,): (f64,) = sqlx::query_as(
                    "SELECT COALESCE(hourly_rate, 0) FROM clients WHERE id = $1 FOR UPDATE",
                )
                .bind(task.client_id)
                .fetch_one(&mut *tx)
                .await?;

                let revenue = hourly_rate * task.tracked_hours;

                let updated = sqlx::query_as::<_, Task>(
                    r#"
                    UPDATE tasks
                    SET status = $3, revenue = $4, completed_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND user_id = $2
                    RETURNING id, user_id, client_id, title, description, status, estimated_duration,
                              due_date, start_date, start_time, end_date, end_time,
                              tracked_hours, revenue, completed_at, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .bind(status)
                .bind(revenue)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    UPDATE clients
                    SET active_tasks = active_tasks - 1,
                        completed_tasks = completed_tasks + 1,
                        total_revenue = total_revenue + $2,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(task.client_id)
                .bind(revenue)
                .execute(&mut *tx)
                .await?;

                updated
            }
            (TaskStatus::Done, _) => {
                let updated = sqlx::query_as::<_, Task>(
                    r#"
                    UPDATE tasks
                    SET status = $3, revenue = 0, completed_at = NULL, updated_at = NOW()
                    WHERE id = $1 AND user_id = $2
                    RETURNING id, user_id, client_id, title, description, status, estimated_duration,
                              due_date, start_date, start_time, end_date, end_time,
                              tracked_hours, revenue, completed_at, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .bind(status)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    UPDATE clients
                    SET active_tasks = active_tasks + 1,
                        completed_tasks = completed_tasks - 1,
                        total_revenue = total_revenue - $2,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(task.client_id)
                .bind(task.revenue)
                .execute(&mut *tx)
                .await?;

                updated
            }
            _ => {
                sqlx::query_as::<_, Task>(
                    r#"
                    UPDATE tasks
                    SET status = $3, updated_at = NOW()
                    WHERE id = $1 AND user_id = $2
                    RETURNING id, user_id, client_id, title, description, status, estimated_duration,
                              due_date, start_date, start_time, end_date, end_time,
                              tracked_hours, revenue, completed_at, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(user_id)
                .bind(status)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(Some(updated))
    }

    /// Replaces the set of tasks blocking this one
    ///
    /// The new edge set is validated inside the writing transaction: every
    /// referenced task must exist for this user, self-references are
    /// rejected, and the resulting per-user graph must stay acyclic.
    ///
    /// # Returns
    ///
    /// The task if found, None if it doesn't exist for this user
    pub async fn set_blocked_by(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        blocked_by: Vec<Uuid>,
    ) -> Result<Option<Self>, DependencyError> {
        let mut tx = pool.begin().await?;

        let Some(task) = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, client_id, title, description, status, estimated_duration,
                   due_date, start_date, start_time, end_date, end_time,
                   tracked_hours, revenue, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let blocked_by = dedupe_ids(&blocked_by);

        if blocked_by.contains(&id) {
            return Err(DependencyError::SelfReference);
        }

        verify_tasks_exist(&mut tx, user_id, &blocked_by).await?;

        // Edges of every other task this user owns; this task's own outgoing
        // edges are about to be replaced, so they are excluded
        let other_edges: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT td.task_id, td.blocked_by
            FROM task_dependencies td
            JOIN tasks t ON t.id = td.task_id
            WHERE t.user_id = $1 AND td.task_id <> $2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if would_close_cycle(id, &blocked_by, &other_edges) {
            return Err(DependencyError::Cycle);
        }

        sqlx::query("DELETE FROM task_dependencies WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if !blocked_by.is_empty() {
            insert_dependency_edges(&mut tx, id, &blocked_by).await?;
        }

        sqlx::query("UPDATE tasks SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(task))
    }

    /// IDs of the tasks blocking this one
    pub async fn blocked_by_ids(pool: &PgPool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT blocked_by FROM task_dependencies WHERE task_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// IDs of the planner slots this task occupies, in day/slot order
    pub async fn schedule_ids(pool: &PgPool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM schedule_items WHERE task_id = $1 ORDER BY day, slot",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Deletes a task and rolls its contribution out of the client counters
    ///
    /// Deleting an open task decrements `active_tasks`; deleting a done task
    /// decrements `completed_tasks` and subtracts the revenue it had
    /// captured. Dependency edges and schedule items disappear via cascade.
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist for this user
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(task) = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, client_id, title, description, status, estimated_duration,
                   due_date, start_date, start_time, end_date, end_time,
                   tracked_hours, revenue, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if task.status.is_done() {
            sqlx::query(
                r#"
                UPDATE clients
                SET completed_tasks = completed_tasks - 1,
                    total_revenue = total_revenue - $2,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(task.client_id)
            .bind(task.revenue)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE clients
                SET active_tasks = active_tasks - 1, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(task.client_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }
}

/// Removes duplicates while preserving order
fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}

/// Checks that every ID in `ids` is a task owned by `user_id`
async fn verify_tasks_exist(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<(), DependencyError> {
    if ids.is_empty() {
        return Ok(());
    }

    let existing: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM tasks WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?;

    let existing: HashSet<Uuid> = existing.into_iter().collect();

    for id in ids {
        if !existing.contains(id) {
            return Err(DependencyError::UnknownTask(*id));
        }
    }

    Ok(())
}

async fn insert_dependency_edges(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    task_id: Uuid,
    blocked_by: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO task_dependencies (task_id, blocked_by)
        SELECT $1, blocker FROM UNNEST($2::uuid[]) AS blocker
        "#,
    )
    .bind(task_id)
    .bind(blocked_by)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Checks whether giving `task_id` the edges in `new_deps` would close a
/// cycle, given the rest of the graph in `edges` (task_id → blocked_by pairs)
///
/// The rest of the graph is assumed acyclic, so any new cycle must pass
/// through one of the new edges. A depth-first walk from each new dependency
/// looking for a path back to `task_id` is therefore sufficient.
fn would_close_cycle(task_id: Uuid, new_deps: &[Uuid], edges: &[(Uuid, Uuid)]) -> bool {
    let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (from, to) in edges {
        adjacency.entry(*from).or_default().push(*to);
    }

    let mut stack: Vec<Uuid> = new_deps.to_vec();
    let mut visited: HashSet<Uuid> = HashSet::new();

    while let Some(node) = stack.pop() {
        if node == task_id {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if let Some(next) = adjacency.get(&node) {
            stack.extend(next.iter().copied());
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let status: TaskStatus = serde_json::from_str("\"todo\"").unwrap();
        assert_eq!(status, TaskStatus::Todo);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("in_progress"), None);
    }

    #[test]
    fn test_is_done() {
        assert!(TaskStatus::Done.is_done());
        assert!(!TaskStatus::Todo.is_done());
        assert!(!TaskStatus::InProgress.is_done());
    }

    #[test]
    fn test_dedupe_preserves_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedupe_ids(&[a, b, a, b, a]), vec![a, b]);
    }

    #[test]
    fn test_cycle_check_allows_chain() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // c -> b exists; adding b -> a keeps the chain acyclic
        assert!(!would_close_cycle(b, &[a], &[(c, b)]));
    }

    #[test]
    fn test_cycle_check_allows_diamond() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // b -> d and c -> d exist; adding a -> b and a -> c forms a diamond, no cycle
        assert!(!would_close_cycle(a, &[b, c], &[(b, d), (c, d)]));
    }

    #[test]
    fn test_cycle_check_rejects_direct_cycle() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        // b -> a exists; adding a -> b closes the loop
        assert!(would_close_cycle(a, &[b], &[(b, a)]));
    }

    #[test]
    fn test_cycle_check_rejects_transitive_cycle() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // b -> c -> d -> a exists; adding a -> b closes a four-node loop
        assert!(would_close_cycle(a, &[b], &[(b, c), (c, d), (d, a)]));
    }

    #[test]
    fn test_cycle_check_self_reference() {
        let a = Uuid::new_v4();
        assert!(would_close_cycle(a, &[a], &[]));
    }

    #[test]
    fn test_cycle_check_ignores_disconnected_edges() {
        let (a, b, x, y) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // x -> y is unrelated to the a -> b edge being added
        assert!(!would_close_cycle(a, &[b], &[(x, y)]));
    }

    #[test]
    fn test_update_task_default_is_empty() {
        let update = UpdateTask::default();
        assert!(update.title.is_none());
        assert!(update.tracked_hours.is_none());
        assert!(update.due_date.is_none());
    }

    #[test]
    fn test_update_task_null_clears_value() {
        // Absent field: leave alone. Explicit null: clear the column.
        let update: UpdateTask =
            serde_json::from_str(r#"{"due_date":null,"title":"Renamed"}"#).unwrap();

        assert_eq!(update.due_date, Some(None));
        assert_eq!(update.title.as_deref(), Some("Renamed"));
        assert!(update.description.is_none());
    }

    #[test]
    fn test_create_task_validation() {
        let create = CreateTask {
            client_id: Uuid::new_v4(),
            title: "Quarterly VAT filing".to_string(),
            description: None,
            estimated_duration: 90,
            due_date: None,
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            blocked_by: vec![],
        };
        assert!(create.validate().is_ok());

        let zero_duration = CreateTask {
            estimated_duration: 0,
            ..create.clone()
        };
        assert!(zero_duration.validate().is_err());

        let empty_title = CreateTask {
            title: String::new(),
            ..create
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_update_task_validation() {
        let update = UpdateTask {
            tracked_hours: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        assert!(UpdateTask::default().validate().is_ok());
    }

    // Integration tests for the rollup and DAG behavior are in taskflow-api/tests/
}

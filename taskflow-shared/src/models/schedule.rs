/// Planner schedule items
///
/// A schedule item binds a task to one half-hour slot on one day. The
/// database enforces slot exclusivity per user through the
/// `schedule_items_slot_unique` constraint, so two requests racing for the
/// same slot cannot both win; the loser surfaces as a conflict.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE schedule_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     day DATE NOT NULL,
///     slot TIME NOT NULL,
///     locked BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT schedule_items_slot_unique UNIQUE (user_id, day, slot)
/// );
/// ```

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task::TaskStatus;

/// Length of one planner slot in minutes
pub const SLOT_MINUTES: u32 = 30;

/// Checks that a time sits exactly on a half-hour boundary
pub fn is_slot_boundary(slot: NaiveTime) -> bool {
    slot.minute() % SLOT_MINUTES == 0 && slot.second() == 0 && slot.nanosecond() == 0
}

/// A task pinned to one planner slot
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub day: NaiveDate,
    pub slot: NaiveTime,

    /// Locked items cannot be moved or removed until unlocked
    pub locked: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for placing a task into a slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleItem {
    pub task_id: Uuid,
    pub day: NaiveDate,
    pub slot: NaiveTime,
}

/// Schedule item joined with the task it points at, for day views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleItemDetail {
    pub id: Uuid,
    pub task_id: Uuid,
    pub day: NaiveDate,
    pub slot: NaiveTime,
    pub locked: bool,
    pub task_title: String,
    pub task_status: TaskStatus,
    pub task_estimated_duration: i32,
    pub client_id: Uuid,
}

impl ScheduleItem {
    /// Places a task into a slot
    ///
    /// # Errors
    ///
    /// Surfaces the unique-constraint violation when the slot is already
    /// taken for this user and day.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateScheduleItem,
    ) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, ScheduleItem>(
            r#"
            INSERT INTO schedule_items (user_id, task_id, day, slot)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, task_id, day, slot, locked, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.task_id)
        .bind(data.day)
        .bind(data.slot)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    /// Finds a schedule item by ID, scoped to its owning user
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, ScheduleItem>(
            r#"
            SELECT id, user_id, task_id, day, slot, locked, created_at, updated_at
            FROM schedule_items
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Lists one day's slots with their task details, in slot order
    pub async fn list_for_day(
        pool: &PgPool,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<ScheduleItemDetail>, sqlx::Error> {
        let items = sqlx::query_as::<_, ScheduleItemDetail>(
            r#"
            SELECT si.id, si.task_id, si.day, si.slot, si.locked,
                   t.title AS task_title, t.status AS task_status,
                   t.estimated_duration AS task_estimated_duration, t.client_id
            FROM schedule_items si
            JOIN tasks t ON t.id = si.task_id
            WHERE si.user_id = $1 AND si.day = $2
            ORDER BY si.slot
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    /// Moves an item to another day/slot
    ///
    /// # Errors
    ///
    /// Surfaces the unique-constraint violation when the target slot is
    /// already taken.
    pub async fn move_to(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        day: NaiveDate,
        slot: NaiveTime,
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, ScheduleItem>(
            r#"
            UPDATE schedule_items
            SET day = $3, slot = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, task_id, day, slot, locked, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(day)
        .bind(slot)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Locks or unlocks an item
    pub async fn set_locked(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        locked: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, ScheduleItem>(
            r#"
            UPDATE schedule_items
            SET locked = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, task_id, day, slot, locked, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(locked)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Removes an item from the planner
    ///
    /// Callers are expected to refuse locked items before getting here.
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_slot_boundary_accepts_half_hours() {
        assert!(is_slot_boundary(time(0, 0, 0)));
        assert!(is_slot_boundary(time(8, 30, 0)));
        assert!(is_slot_boundary(time(23, 0, 0)));
    }

    #[test]
    fn test_slot_boundary_rejects_everything_else() {
        assert!(!is_slot_boundary(time(8, 15, 0)));
        assert!(!is_slot_boundary(time(8, 30, 1)));
        assert!(!is_slot_boundary(time(8, 29, 59)));
    }
}

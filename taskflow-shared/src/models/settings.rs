/// Per-user settings and availability windows
///
/// Settings hold the display currency; availability windows describe when the
/// user normally works, as weekday sets with a daily time range. The planner
/// day view joins these in so the UI can shade working hours. Weekdays use
/// ISO numbering, 1 = Monday through 7 = Sunday.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE settings (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     currency VARCHAR(3) NOT NULL DEFAULT 'EUR',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE availability_windows (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     weekdays SMALLINT[] NOT NULL,
///     start_time TIME NOT NULL,
///     end_time TIME NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Per-user settings row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Settings {
    pub user_id: Uuid,

    /// Display currency (ISO 4217 code)
    pub currency: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recurring availability window
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub user_id: Uuid,

    /// ISO weekday numbers this window applies to (1 = Monday)
    pub weekdays: Vec<i16>,

    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// Input for adding an availability window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityWindow {
    pub weekdays: Vec<i16>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Settings {
    /// Fetches the settings row for a user, creating the default one first
    /// if it doesn't exist yet
    pub async fn get_or_create(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT INTO settings (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(pool)
            .await?;

        let settings = sqlx::query_as::<_, Settings>(
            "SELECT user_id, currency, created_at, updated_at FROM settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(settings)
    }

    /// Sets the display currency, creating the row if needed
    pub async fn update_currency(
        pool: &PgPool,
        user_id: Uuid,
        currency: &str,
    ) -> Result<Self, sqlx::Error> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            INSERT INTO settings (user_id, currency)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET currency = EXCLUDED.currency, updated_at = NOW()
            RETURNING user_id, currency, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(currency)
        .fetch_one(pool)
        .await?;

        Ok(settings)
    }
}

impl AvailabilityWindow {
    /// Adds an availability window for a user
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateAvailabilityWindow,
    ) -> Result<Self, sqlx::Error> {
        let window = sqlx::query_as::<_, AvailabilityWindow>(
            r#"
            INSERT INTO availability_windows (user_id, weekdays, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, weekdays, start_time, end_time, created_at
            "#,
        )
        .bind(user_id)
        .bind(data.weekdays)
        .bind(data.start_time)
        .bind(data.end_time)
        .fetch_one(pool)
        .await?;

        Ok(window)
    }

    /// Lists all windows for a user, earliest start first
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let windows = sqlx::query_as::<_, AvailabilityWindow>(
            r#"
            SELECT id, user_id, weekdays, start_time, end_time, created_at
            FROM availability_windows
            WHERE user_id = $1
            ORDER BY start_time
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(windows)
    }

    /// Lists the windows covering one ISO weekday
    pub async fn list_for_weekday(
        pool: &PgPool,
        user_id: Uuid,
        weekday: i16,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let windows = sqlx::query_as::<_, AvailabilityWindow>(
            r#"
            SELECT id, user_id, weekdays, start_time, end_time, created_at
            FROM availability_windows
            WHERE user_id = $1 AND $2 = ANY(weekdays)
            ORDER BY start_time
            "#,
        )
        .bind(user_id)
        .bind(weekday)
        .fetch_all(pool)
        .await?;

        Ok(windows)
    }

    /// Removes a window
    ///
    /// # Returns
    ///
    /// True if the window was deleted, false if it didn't exist for this user
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM availability_windows WHERE id = $1 AND user_id = $2")
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

    #[test]
    fn test_create_window_serde() {
        let json = r#"{"weekdays":[1,2,3,4,5],"start_time":"09:00:00","end_time":"17:30:00"}"#;
        let window: CreateAvailabilityWindow = serde_json::from_str(json).unwrap();

        assert_eq!(window.weekdays, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            window.start_time,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            window.end_time,
            NaiveTime::from_hms_opt(17, 30, 0).unwrap()
        );
    }
}

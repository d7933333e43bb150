/// Dashboard aggregates
///
/// Everything here is computed live from the tasks and clients tables rather
/// than read from the denormalized client counters, so the dashboard shows
/// the truth even if a counter ever drifted. Monthly figures bucket on
/// `completed_at`, which is only set while a task is done.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    /// All tasks for this user
    pub total_tasks: i64,

    /// Tasks not yet done
    pub active_tasks: i64,

    /// Tasks not yet done that already have hours tracked against them
    pub open_tasks: i64,

    /// Tasks marked done
    pub completed_tasks: i64,

    /// Number of clients
    pub total_clients: i64,

    /// Hours tracked across all tasks
    pub tracked_hours: f64,

    /// Revenue captured by completed tasks
    pub total_revenue: f64,

    /// Revenue captured by tasks completed in the current month
    pub month_revenue: f64,
}

/// Revenue bucket granularity for the dashboard chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueGranularity {
    /// One point per day over the trailing seven days
    Weekly,

    /// One point per month over the trailing twelve months
    Monthly,
}

/// One bucket in a revenue series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenuePoint {
    /// Bucket label: an ISO date for daily buckets, "YYYY-MM" for monthly
    pub label: String,

    /// Revenue captured by tasks completed in this bucket
    pub revenue: f64,
}

impl DashboardStats {
    /// Computes the dashboard headline numbers for one user
    pub async fn compute(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let (total_tasks, active_tasks, open_tasks, completed_tasks, tracked_hours, total_revenue, month_revenue): (i64, i64, i64, i64, f64, f64, f64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status <> 'done'),
                    COUNT(*) FILTER (WHERE status <> 'done' AND tracked_hours > 0),
                    COUNT(*) FILTER (WHERE status = 'done'),
                    COALESCE(SUM(tracked_hours), 0),
                    COALESCE(SUM(revenue) FILTER (WHERE status = 'done'), 0),
                    COALESCE(SUM(revenue) FILTER (
                        WHERE status = 'done'
                        AND date_trunc('month', completed_at) = date_trunc('month', NOW())
                    ), 0)
                FROM tasks
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        let (total_clients,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM clients WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(DashboardStats {
            total_tasks,
            active_tasks,
            open_tasks,
            completed_tasks,
            total_clients,
            tracked_hours,
            total_revenue,
            month_revenue,
        })
    }
}

/// Computes the revenue series for the dashboard chart
///
/// Buckets are zero-filled and returned oldest first, so the chart always has
/// exactly 7 daily or 12 monthly points regardless of activity.
pub async fn revenue_series(
    pool: &PgPool,
    user_id: Uuid,
    granularity: RevenueGranularity,
) -> Result<Vec<RevenuePoint>, sqlx::Error> {
    let rows: Vec<(String, f64)> = match granularity {
        RevenueGranularity::Weekly => {
            sqlx::query_as(
                r#"
                SELECT to_char(d.day, 'YYYY-MM-DD'),
                       COALESCE(SUM(t.revenue), 0)
                FROM generate_series(
                    CURRENT_DATE - INTERVAL '6 days', CURRENT_DATE, INTERVAL '1 day'
                ) AS d(day)
                LEFT JOIN tasks t
                    ON t.user_id = $1
                    AND t.status = 'done'
                    AND t.completed_at::date = d.day::date
                GROUP BY d.day
                ORDER BY d.day
                "#,
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
        RevenueGranularity::Monthly => {
            sqlx::query_as(
                r#"
                SELECT to_char(m.month, 'YYYY-MM'),
                       COALESCE(SUM(t.revenue), 0)
                FROM generate_series(
                    date_trunc('month', NOW()) - INTERVAL '11 months',
                    date_trunc('month', NOW()),
                    INTERVAL '1 month'
                ) AS m(month)
                LEFT JOIN tasks t
                    ON t.user_id = $1
                    AND t.status = 'done'
                    AND date_trunc('month', t.completed_at) = m.month
                GROUP BY m.month
                ORDER BY m.month
                "#,
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|(label, revenue)| RevenuePoint { label, revenue })
        .collect())
}

/// An open task with a deadline, for the dashboard's upcoming list
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DueSoonTask {
    pub id: Uuid,
    pub title: String,
    pub due_date: NaiveDate,
}

/// Returns open tasks with the nearest due dates, soonest first
///
/// Done tasks no longer have a deadline worth surfacing.
pub async fn upcoming_due_tasks(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<DueSoonTask>, sqlx::Error> {
    let tasks = sqlx::query_as::<_, DueSoonTask>(
        r#"
        SELECT id, title, due_date
        FROM tasks
        WHERE user_id = $1 AND status <> 'done' AND due_date IS NOT NULL
        ORDER BY due_date
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_serde() {
        let g: RevenueGranularity = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(g, RevenueGranularity::Weekly);

        let json = serde_json::to_string(&RevenueGranularity::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
    }
}

/// Database models for TaskFlow
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and authentication
/// - `client`: Clients with denormalized task and revenue counters
/// - `task`: Tasks, their status machine, and blocked-by dependencies
/// - `schedule`: Daily planner slot assignments
/// - `settings`: Per-user preferences and availability windows
/// - `stats`: Dashboard aggregates and revenue series
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::user::{User, CreateUser};
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     google_sub: None,
///     name: Some("John Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod schedule;
pub mod settings;
pub mod stats;
pub mod task;
pub mod user;

/// Deserializes an update field that tells "absent" apart from "null"
///
/// Used as `#[serde(default, deserialize_with = "double_option")]` on nested
/// Option fields: an absent field stays `None` (leave the column alone) while
/// an explicit JSON null arrives as `Some(None)` (clear the column).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user
/// accounts. Every other record in the system (clients, tasks, schedule items,
/// settings) hangs off a user and is removed with it.
///
/// Accounts authenticate either with an Argon2id password hash or through a
/// linked Google subject, so both credential columns are nullable but at least
/// one must be set.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255),
///     google_sub VARCHAR(255) UNIQUE,
///     name VARCHAR(255),
///     role VARCHAR(20) NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CONSTRAINT users_role_check CHECK (role IN ('admin', 'user')),
///     CONSTRAINT users_credentials_check CHECK (
///         password_hash IS NOT NULL OR google_sub IS NOT NULL
///     )
/// );
/// ```
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
/// // Create a new user
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     google_sub: None,
///     name: Some("John Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// println!("Created user: {}", user.id);
///
/// // Find by email
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Account roles
///
/// Admins can list all accounts; everything else is scoped to the
/// authenticated user regardless of role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator (account management endpoints)
    Admin,

    /// Regular account
    User,
}

impl UserRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    /// Parses role from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }
}

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. Google-only
/// accounts have no password hash at all.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    ///
    /// Must be unique across all users
    pub email: String,

    /// Argon2id password hash, None for Google-only accounts
    pub password_hash: Option<String>,

    /// Google account subject claim, None unless Google sign-in is linked
    pub google_sub: Option<String>,

    /// Optional display name
    pub name: Option<String>,

    /// Account role ('admin' or 'user')
    pub role: String,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
///
/// Email is required plus at least one credential. The role always starts as
/// 'user'; promotion is a manual operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (stored case-insensitively via CITEXT)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: Option<String>,

    /// Google account subject claim
    pub google_sub: Option<String>,

    /// Optional display name
    pub name: Option<String>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - User creation data
    ///
    /// # Returns
    ///
    /// The newly created user with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Neither credential is provided (check constraint violation)
    /// - Database connection fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use taskflow_shared::models::user::{User, CreateUser};
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// let new_user = CreateUser {
    ///     email: "user@example.com".to_string(),
    ///     password_hash: Some("$argon2id$...".to_string()),
    ///     google_sub: None,
    ///     name: Some("John Doe".to_string()),
    /// };
    ///
    /// let user = User::create(&pool, new_user).await?;
    /// println!("Created user: {}", user.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, google_sub, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, google_sub, name, role,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.google_sub)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `id` - User ID to search for
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, google_sub, name, role,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// Email lookup is case-insensitive (via CITEXT column type).
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `email` - Email address to search for (case-insensitive)
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use taskflow_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// let user = User::find_by_email(&pool, "user@example.com").await?;
    /// if let Some(u) = user {
    ///     println!("Found user: {}", u.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, google_sub, name, role,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by their Google subject claim
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `google_sub` - Google `sub` claim from the userinfo endpoint
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_google_sub(
        pool: &PgPool,
        google_sub: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, google_sub, name, role,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE google_sub = $1
            "#,
        )
        .bind(google_sub)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Attaches a Google subject claim to an existing account
    ///
    /// Called the first time a known email signs in through Google, so later
    /// sign-ins resolve by subject directly.
    ///
    /// # Returns
    ///
    /// True if the user was found and updated, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The subject is already linked to another account
    /// - Database connection fails
    pub async fn link_google_sub(
        pool: &PgPool,
        id: Uuid,
        google_sub: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET google_sub = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(google_sub)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by ID
    ///
    /// This permanently deletes the account and, via ON DELETE CASCADE, every
    /// client, task, schedule item, and settings row it owns.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    ///
    /// This is typically called after successful authentication.
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all users with pagination
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `limit` - Maximum number of users to return
    /// * `offset` - Number of users to skip (for pagination)
    ///
    /// # Returns
    ///
    /// Vector of users, ordered by creation date (newest first)
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, google_sub, name, role,
                   created_at, updated_at, last_login_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts total number of users
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Returns the account role as a typed enum
    ///
    /// Returns None if the stored value is not a recognized role.
    pub fn get_role(&self) -> Option<UserRole> {
        UserRole::from_str(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_struct() {
        let create_user = CreateUser {
            email: "test@example.com".to_string(),
            password_hash: Some("hash".to_string()),
            google_sub: None,
            name: Some("Test User".to_string()),
        };

        assert_eq!(create_user.email, "test@example.com");
        assert_eq!(create_user.password_hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_user_role_round_trip() {
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("user"), Some(UserRole::User));
        assert_eq!(UserRole::from_str("superuser"), None);
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::User.as_str(), "user");
    }

    #[test]
    fn test_user_role_serde_lowercase() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");

        let role: UserRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, UserRole::User);
    }

    // Integration tests for database operations are in taskflow-api/tests/
}

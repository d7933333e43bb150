/// Client model and database operations
///
/// Clients are the billing side of the system: every task belongs to one, and
/// marking tasks done rolls revenue up into the owning client's counters. The
/// counters (`active_tasks`, `completed_tasks`, `total_revenue`) are
/// denormalized and maintained inside the same transactions that change task
/// state, so reads never have to aggregate the tasks table just to render a
/// client list.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     email CITEXT,
///     phone VARCHAR(50),
///     address TEXT,
///     vat_number VARCHAR(50),
///     currency VARCHAR(3),
///     hourly_rate DOUBLE PRECISION,
///     monthly_wage DOUBLE PRECISION,
///     active_tasks INTEGER NOT NULL DEFAULT 0,
///     completed_tasks INTEGER NOT NULL DEFAULT 0,
///     total_revenue DOUBLE PRECISION NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::client::{Client, CreateClient};
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_client = CreateClient {
///     name: "Acme Corp".to_string(),
///     email: Some("billing@acme.example".to_string()),
///     hourly_rate: Some(85.0),
///     ..Default::default()
/// };
///
/// let client = Client::create(&pool, user_id, new_client).await?;
/// println!("Created client: {}", client.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::double_option;

/// Client model representing a billable client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    /// Unique client ID (UUID v4)
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Client name
    pub name: String,

    /// Contact email
    pub email: Option<String>,

    /// Contact phone number
    pub phone: Option<String>,

    /// Postal address
    pub address: Option<String>,

    /// VAT/tax identifier for invoicing
    pub vat_number: Option<String>,

    /// Preferred billing currency (ISO 4217 code)
    pub currency: Option<String>,

    /// Hourly rate used when computing task revenue
    pub hourly_rate: Option<f64>,

    /// Fixed monthly wage, for retainer-style clients
    pub monthly_wage: Option<f64>,

    /// Number of tasks not yet done
    pub active_tasks: i32,

    /// Number of tasks marked done
    pub completed_tasks: i32,

    /// Revenue accumulated from completed tasks
    pub total_revenue: f64,

    /// When the client was created
    pub created_at: DateTime<Utc>,

    /// When the client was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new client
///
/// Only the name is required; the counters always start at zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateClient {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate: Option<f64>,
    #[validate(range(min = 0.0, message = "Monthly wage cannot be negative"))]
    pub monthly_wage: Option<f64>,
}

/// Input for updating an existing client
///
/// All fields are optional. Nullable columns take a nested Option so an
/// absent field leaves the column alone while an explicit null clears it;
/// the derive only sees the outer layer, so the API validates the inner
/// values itself. The counters are not updatable here; they belong to the
/// task state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateClient {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub vat_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub currency: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub hourly_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub monthly_wage: Option<Option<f64>>,
}

/// Aggregates computed live from the tasks table for one client
///
/// Unlike the stored counters on [`Client`], these are recomputed per request
/// and include the current-month revenue slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStats {
    pub total_tasks: i64,
    pub active_tasks: i64,
    pub completed_tasks: i64,
    pub tracked_hours: f64,
    pub total_revenue: f64,
    pub month_revenue: f64,
}

impl Client {
    /// Creates a new client owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateClient,
    ) -> Result<Self, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (user_id, name, email, phone, address, vat_number,
                                 currency, hourly_rate, monthly_wage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, name, email, phone, address, vat_number, currency,
                      hourly_rate, monthly_wage, active_tasks, completed_tasks,
                      total_revenue, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.vat_number)
        .bind(data.currency)
        .bind(data.hourly_rate)
        .bind(data.monthly_wage)
        .fetch_one(pool)
        .await?;

        Ok(client)
    }

    /// Finds a client by ID, scoped to its owning user
    ///
    /// Returns None both when the ID doesn't exist and when it belongs to a
    /// different user, so callers cannot tell the two cases apart.
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, user_id, name, email, phone, address, vat_number, currency,
                   hourly_rate, monthly_wage, active_tasks, completed_tasks,
                   total_revenue, created_at, updated_at
            FROM clients
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    /// Lists all clients owned by `user_id`, newest first
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, user_id, name, email, phone, address, vat_number, currency,
                   hourly_rate, monthly_wage, active_tasks, completed_tasks,
                   total_revenue, created_at, updated_at
            FROM clients
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(clients)
    }

    /// Updates an existing client
    ///
    /// Only non-None fields in `data` are written. The `updated_at` timestamp
    /// is always refreshed.
    ///
    /// # Returns
    ///
    /// The updated client if found, None if it doesn't exist for this user
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        data: UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE clients SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.address.is_some() {
            bind_count += 1;
            query.push_str(&format!(", address = ${}", bind_count));
        }
        if data.vat_number.is_some() {
            bind_count += 1;
            query.push_str(&format!(", vat_number = ${}", bind_count));
        }
        if data.currency.is_some() {
            bind_count += 1;
            query.push_str(&format!(", currency = ${}", bind_count));
        }
        if data.hourly_rate.is_some() {
            bind_count += 1;
            query.push_str(&format!(", hourly_rate = ${}", bind_count));
        }
        if data.monthly_wage.is_some() {
            bind_count += 1;
            query.push_str(&format!(", monthly_wage = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, name, email, phone, address, vat_number, currency, \
             hourly_rate, monthly_wage, active_tasks, completed_tasks, total_revenue, \
             created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Client>(&query).bind(id).bind(user_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(vat_number) = data.vat_number {
            q = q.bind(vat_number);
        }
        if let Some(currency) = data.currency {
            q = q.bind(currency);
        }
        if let Some(hourly_rate) = data.hourly_rate {
            q = q.bind(hourly_rate);
        }
        if let Some(monthly_wage) = data.monthly_wage {
            q = q.bind(monthly_wage);
        }

        let client = q.fetch_optional(pool).await?;

        Ok(client)
    }

    /// Deletes a client and everything attached to it
    ///
    /// Tasks, their dependency edges, and schedule items referencing those
    /// tasks are removed by ON DELETE CASCADE in the same statement.
    ///
    /// # Returns
    ///
    /// True if the client was deleted, false if it didn't exist for this user
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Computes live task aggregates for one client
    ///
    /// Returns None if the client doesn't exist for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn stats(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientStats>, sqlx::Error> {
        if Self::find_by_id(pool, user_id, id).await?.is_none() {
            return Ok(None);
        }

        let row: (i64, i64, i64, f64, f64, f64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status <> 'done'),
                COUNT(*) FILTER (WHERE status = 'done'),
                COALESCE(SUM(tracked_hours), 0),
                COALESCE(SUM(revenue) FILTER (WHERE status = 'done'), 0),
                COALESCE(SUM(revenue) FILTER (
                    WHERE status = 'done'
                    AND date_trunc('month', completed_at) = date_trunc('month', NOW())
                ), 0)
            FROM tasks
            WHERE client_id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let (total_tasks, active_tasks, completed_tasks, tracked_hours, total_revenue, month_revenue) =
            row;

        Ok(Some(ClientStats {
            total_tasks,
            active_tasks,
            completed_tasks,
            tracked_hours,
            total_revenue,
            month_revenue,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_defaults() {
        let create = CreateClient {
            name: "Acme Corp".to_string(),
            ..Default::default()
        };

        assert_eq!(create.name, "Acme Corp");
        assert!(create.email.is_none());
        assert!(create.hourly_rate.is_none());
    }

    #[test]
    fn test_update_client_clearable_fields() {
        // Some(None) means "clear the column", None means "leave it alone"
        let update: UpdateClient =
            serde_json::from_str(r#"{"email":null,"hourly_rate":55.0}"#).unwrap();

        assert_eq!(update.email, Some(None));
        assert_eq!(update.hourly_rate, Some(Some(55.0)));
        assert!(update.monthly_wage.is_none());
        assert!(update.name.is_none());
    }

    #[test]
    fn test_create_client_validation() {
        let valid = CreateClient {
            name: "Acme Corp".to_string(),
            email: Some("billing@acme.example".to_string()),
            currency: Some("EUR".to_string()),
            hourly_rate: Some(85.0),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let empty_name = CreateClient {
            name: String::new(),
            ..Default::default()
        };
        assert!(empty_name.validate().is_err());

        let negative_rate = CreateClient {
            name: "Acme Corp".to_string(),
            hourly_rate: Some(-5.0),
            ..Default::default()
        };
        assert!(negative_rate.validate().is_err());
    }

    #[test]
    fn test_update_client_name_validation() {
        let update = UpdateClient {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let untouched = UpdateClient::default();
        assert!(untouched.validate().is_ok());
    }

    // Integration tests for database operations are in taskflow-api/tests/
}

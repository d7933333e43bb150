/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and migrations
/// - Test user creation
/// - JWT token generation
/// - Seed helpers for clients and tasks
/// - Response body helpers

use sqlx::PgPool;
use taskflow_api::app::{build_router, AppState};
use taskflow_api::config::Config;
use taskflow_shared::auth::jwt::{create_token, Claims, TokenType};
use taskflow_shared::auth::password::hash_password;
use taskflow_shared::events::EventHub;
use taskflow_shared::models::client::{Client, CreateClient};
use taskflow_shared::models::task::{CreateTask, Task};
use taskflow_shared::models::user::{CreateUser, User, UserRole};
use uuid::Uuid;

/// Password used for every account the harness creates
///
/// Long enough and mixed enough to clear the registration policy.
pub const TEST_PASSWORD: &str = "hunter2hunter2";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub events: EventHub,
    pub user: User,
    pub jwt_token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh user
    pub async fn new() -> anyhow::Result<Self> {
        // Load test configuration
        let config = Config::from_env()?;

        // Connect to database
        let db = PgPool::connect(&config.database.url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../taskflow-shared/migrations").run(&db).await?;

        // Create test user
        let user = create_user(&db, &format!("test-{}@example.com", Uuid::new_v4())).await?;

        // Generate JWT token
        let jwt_token = token_for(&config, user.id, UserRole::User)?;

        // Build app, keeping a handle on the change feed for assertions
        let state = AppState::new(db.clone(), config.clone())?;
        let events = state.events.clone();
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            events,
            user,
            jwt_token,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Grants the context user the admin role and re-mints the token
    ///
    /// The role rides in the JWT, so the old token would still act as a
    /// regular user.
    pub async fn promote_to_admin(&mut self) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(self.user.id)
            .execute(&self.db)
            .await?;

        self.jwt_token = token_for(&self.config, self.user.id, UserRole::Admin)?;
        Ok(())
    }

    /// Creates an unrelated account for cross-user isolation tests
    pub async fn other_user(&self) -> anyhow::Result<(User, String)> {
        let user = create_user(&self.db, &format!("other-{}@example.com", Uuid::new_v4())).await?;
        let token = token_for(&self.config, user.id, UserRole::User)?;
        Ok((user, token))
    }

    /// Cleans up test data
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        // Delete test user (cascades to clients, tasks, schedule, settings)
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Inserts a user with a real password hash so login flows work
pub async fn create_user(db: &PgPool, email: &str) -> anyhow::Result<User> {
    let user = User::create(
        db,
        CreateUser {
            email: email.to_string(),
            password_hash: Some(hash_password(TEST_PASSWORD)?),
            google_sub: None,
            name: Some("Test User".to_string()),
        },
    )
    .await?;

    Ok(user)
}

/// Mints an access token the way the login handler does
pub fn token_for(config: &Config, user_id: Uuid, role: UserRole) -> anyhow::Result<String> {
    let claims = Claims::new(user_id, role, TokenType::Access);
    Ok(create_token(&claims, &config.auth.jwt_secret)?)
}

/// Helper to create a test client
pub async fn create_test_client(ctx: &TestContext, name: &str) -> anyhow::Result<Client> {
    let client = Client::create(
        &ctx.db,
        ctx.user.id,
        CreateClient {
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            vat_number: None,
            currency: None,
            hourly_rate: Some(50.0),
            monthly_wage: None,
        },
    )
    .await?;

    Ok(client)
}

/// Helper to create a test task for a client
pub async fn create_test_task(
    ctx: &TestContext,
    client_id: Uuid,
    title: &str,
) -> anyhow::Result<Task> {
    let task = Task::create(
        &ctx.db,
        ctx.user.id,
        CreateTask {
            client_id,
            title: title.to_string(),
            description: None,
            estimated_duration: 60,
            due_date: None,
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            blocked_by: Vec::new(),
        },
    )
    .await?;

    Ok(task)
}

/// Reads a response body as JSON
pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&body).expect("Response body is not valid JSON")
}

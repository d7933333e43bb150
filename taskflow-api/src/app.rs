/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskflow_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = taskflow_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskflow_shared::{
    auth::{middleware::require_auth, oauth::GoogleOAuth},
    events::EventHub,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Hub feeding the SSE change feed
    pub events: EventHub,

    /// Google sign-in client, present when credentials are configured
    oauth: Option<GoogleOAuth>,
}

impl AppState {
    /// Creates new application state
    ///
    /// Builds the Google OAuth client up front so a bad redirect URL fails
    /// at boot instead of on the first login attempt.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let oauth = match &config.oauth {
            Some(c) => Some(GoogleOAuth::new(
                c.client_id.clone(),
                c.client_secret.clone(),
                c.redirect_url.clone(),
            )?),
            None => None,
        };

        Ok(Self {
            db,
            config: Arc::new(config),
            events: EventHub::default(),
            oauth,
        })
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.auth.jwt_secret
    }

    /// Gets the session cookie name
    pub fn session_cookie(&self) -> &str {
        &self.config.auth.session_cookie
    }

    /// Gets the Google OAuth client, or 503 when the flow is not configured
    pub fn google_oauth(&self) -> Result<&GoogleOAuth, ApiError> {
        self.oauth.as_ref().ok_or_else(|| {
            ApiError::ServiceUnavailable("Google sign-in is not configured".to_string())
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                   # Health check (public)
/// ├── /v1/                      # API v1 (versioned)
/// │   ├── /auth/                # Register, login, refresh, Google flow
/// │   ├── /clients/             # Client CRUD + per-client tasks and stats
/// │   ├── /tasks/               # Task CRUD, status transitions, dependencies
/// │   ├── /planner/             # Day view and slot assignments
/// │   ├── /settings/            # Currency + availability windows
/// │   ├── /dashboard/           # Aggregated stats and revenue series
/// │   ├── /events               # SSE change feed
/// │   └── /users                # Admin-only user listing
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-route-group)
///
/// # Example
///
/// ```no_run
/// use taskflow_api::app::{AppState, build_router};
/// use taskflow_api::config::Config;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
///
/// let app = build_router(state);
///
/// // Start server
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn build_router(state: AppState) -> Router {
    // Import route handlers
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes: credential endpoints are public, session endpoints are not
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/google", get(routes::auth::google_login))
        .route("/google/callback", get(routes::auth::google_callback))
        .merge(
            Router::new()
                .route("/me", get(routes::auth::me))
                .route("/logout", post(routes::auth::logout))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth_layer,
                )),
        );

    let client_routes = Router::new()
        .route("/", post(routes::clients::create_client))
        .route("/", get(routes::clients::list_clients))
        .route("/:id", get(routes::clients::get_client))
        .route("/:id", patch(routes::clients::update_client))
        .route("/:id", delete(routes::clients::delete_client))
        .route("/:id/tasks", get(routes::clients::client_tasks))
        .route("/:id/stats", get(routes::clients::client_stats));

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", patch(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .route("/:id/status", post(routes::tasks::set_status))
        .route("/:id/blocked-by", put(routes::tasks::set_blocked_by));

    let planner_routes = Router::new()
        .route("/day/:date", get(routes::planner::day_view))
        .route("/items", post(routes::planner::create_item))
        .route("/items/:id", patch(routes::planner::update_item))
        .route("/items/:id", delete(routes::planner::delete_item))
        .route("/items/:id/duration", patch(routes::planner::edit_duration));

    let settings_routes = Router::new()
        .route("/", get(routes::settings::get_settings))
        .route("/", put(routes::settings::update_settings))
        .route("/availability", post(routes::settings::add_availability))
        .route(
            "/availability/:id",
            delete(routes::settings::delete_availability),
        );

    let dashboard_routes = Router::new()
        .route("/stats", get(routes::dashboard::stats))
        .route("/revenue", get(routes::dashboard::revenue))
        .route("/upcoming", get(routes::dashboard::upcoming));

    // Everything below /v1 except /auth requires authentication
    let protected_routes = Router::new()
        .nest("/clients", client_routes)
        .nest("/tasks", task_routes)
        .nest("/planner", planner_routes)
        .nest("/settings", settings_routes)
        .nest("/dashboard", dashboard_routes)
        .route("/events", get(routes::events::stream_events))
        .route("/users", get(routes::users::list_users))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Authentication middleware layer
///
/// Delegates to the shared middleware, which accepts a Bearer token or the
/// session cookie and injects AuthContext into request extensions.
async fn auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, taskflow_shared::auth::middleware::AuthError> {
    require_auth(
        state.jwt_secret().to_string(),
        state.session_cookie().to_string(),
        req,
        next,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, AuthConfig, DatabaseConfig};

    fn test_state() -> AppState {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/taskflow_test".to_string(),
                max_connections: 2,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                session_cookie: "taskflow_session".to_string(),
            },
            oauth: None,
        };

        let pool = PgPool::connect_lazy(&config.database.url).expect("Lazy pool should build");
        AppState::new(pool, config).expect("State should build")
    }

    #[tokio::test]
    async fn test_google_oauth_unconfigured_is_unavailable() {
        let state = test_state();
        assert!(matches!(
            state.google_oauth(),
            Err(ApiError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _router = build_router(test_state());
    }
}

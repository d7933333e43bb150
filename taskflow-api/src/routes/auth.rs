/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration and login with email + password
/// - Google sign-in (authorization code flow)
/// - Token refresh
/// - Profile lookup and logout
///
/// Successful registration, login, and Google callback all mirror the access
/// token into an HttpOnly session cookie, so browser clients are authenticated
/// without storing tokens in script-reachable state. API clients can ignore
/// the cookie and send `Authorization: Bearer` instead.
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `GET /v1/auth/google` - Redirect to Google consent page
/// - `GET /v1/auth/google/callback` - Complete Google sign-in
/// - `GET /v1/auth/me` - Authenticated user's profile
/// - `POST /v1/auth/logout` - Clear the session cookie

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use taskflow_shared::{
    auth::{
        jwt,
        middleware::AuthContext,
        oauth::{self, GoogleUser, OAuthError},
        password,
    },
    models::{
        settings::Settings,
        user::{CreateUser, User, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Cookie carrying the OAuth state nonce between redirect and callback
const OAUTH_STATE_COOKIE: &str = "taskflow_oauth_state";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated against the password policy)
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Response for register, login, and Google sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user
    pub user: UserResponse,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Token refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always true; the session cookie has been cleared
    pub success: bool,
}

/// User profile as exposed over the API
///
/// Deliberately excludes `password_hash` and `google_sub`.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Display name
    pub name: Option<String>,

    /// Account role ("admin" or "user")
    pub role: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the user last logged in
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Query parameters Google appends to the callback redirect
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    /// Authorization code, absent when the user cancelled
    pub code: Option<String>,

    /// State nonce echoed back by Google
    pub state: Option<String>,

    /// Error code (e.g. "access_denied")
    pub error: Option<String>,
}

/// Register a new user
///
/// Creates the account with an Argon2id password hash and its default
/// settings row, then signs the user in.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "hunter2hunter2",
///   "name": "Jane Doe"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "user@example.com", "role": "user", ... },
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Invalid email or weak password
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid_field("password", message))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash: Some(password_hash),
            google_sub: None,
            name: req.name,
        },
    )
    .await?;

    // Every account carries a settings row from the start
    Settings::get_or_create(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "user registered");

    let (access_token, refresh_token) = issue_tokens(&state, &user)?;
    let jar = jar.add(session_cookie(&state, access_token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
        }),
    ))
}

/// Login with email and password
///
/// OAuth-only accounts have no password hash and are rejected with the same
/// message as a wrong password, so the response never reveals which accounts
/// exist or how they authenticate.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "hunter2hunter2"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `422 Unprocessable Entity`: Malformed email
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    let valid = password::verify_password(&req.password, password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    let (access_token, refresh_token) = issue_tokens(&state, &user)?;
    let jar = jar.add(session_cookie(&state, access_token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
        }),
    ))
}

/// Exchange a refresh token for a new access token
///
/// The session cookie is rotated alongside, so browser sessions stay live
/// without re-login.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<(CookieJar, Json<RefreshResponse>)> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;
    let jar = jar.add(session_cookie(&state, access_token.clone()));

    Ok((jar, Json(RefreshResponse { access_token })))
}

/// Start the Google sign-in flow
///
/// Issues a random state nonce, stores it in a short-lived cookie scoped to
/// the auth routes, and redirects to Google's consent page.
///
/// # Errors
///
/// - `503 Service Unavailable`: Google sign-in not configured
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Redirect)> {
    let client = state.google_oauth()?;

    let nonce = oauth::generate_state();
    let url = client.authorize_url(&nonce)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, nonce))
        .path("/v1/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.api.production)
        .max_age(time::Duration::minutes(10))
        .build();

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Complete the Google sign-in flow
///
/// Verifies the state nonce against the cookie set by [`google_login`],
/// exchanges the authorization code for the Google profile, and signs the
/// user in: a known `google_sub` resolves directly, a known email gets the
/// subject linked to it, and anything else provisions a fresh account.
///
/// # Errors
///
/// - `400 Bad Request`: Cancelled consent, missing code, or state mismatch
/// - `503 Service Unavailable`: Google sign-in not configured
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> ApiResult<(CookieJar, Redirect)> {
    let client = state.google_oauth()?;

    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!(
            "Google sign-in failed: {}",
            error
        )));
    }

    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    if expected.is_none() || expected.as_deref() != query.state.as_deref() {
        return Err(OAuthError::StateMismatch.into());
    }

    // One-shot nonce: drop the cookie whether or not the exchange succeeds
    let jar = jar.remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/v1/auth").build());

    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let google_user = client.exchange_code(&code).await?;
    let user = resolve_google_user(&state.db, google_user).await?;

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "user logged in via Google");

    let (access_token, _refresh_token) = issue_tokens(&state, &user)?;
    let jar = jar.add(session_cookie(&state, access_token));

    Ok((jar, Redirect::to("/")))
}

/// The authenticated user's profile
///
/// # Errors
///
/// - `401 Unauthorized`: Token valid but the account no longer exists
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(user.into()))
}

/// Clear the session cookie
///
/// Tokens themselves stay valid until expiry; logout only forgets the
/// browser-side session.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<LogoutResponse>)> {
    let removal = Cookie::build((state.session_cookie().to_string(), ""))
        .path("/")
        .build();

    Ok((jar.remove(removal), Json(LogoutResponse { success: true })))
}

/// Signs an access + refresh token pair for a user
fn issue_tokens(state: &AppState, user: &User) -> Result<(String, String), ApiError> {
    let role = user.get_role().unwrap_or(UserRole::User);

    let access_claims = jwt::Claims::new(user.id, role, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, role, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok((access_token, refresh_token))
}

/// Builds the session cookie carrying an access token
///
/// HttpOnly and SameSite=Lax always; Secure only in production so local
/// development over plain HTTP still works. Max-Age matches the access
/// token's 24h lifetime.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.session_cookie().to_string(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.api.production)
        .max_age(time::Duration::hours(24))
        .build()
}

/// Maps a Google profile onto a local account
///
/// Resolution order: existing account with this subject, then existing
/// account with this email (subject gets linked), then a new account with no
/// password. New accounts get their settings row immediately, same as
/// password registration.
async fn resolve_google_user(db: &PgPool, profile: GoogleUser) -> Result<User, ApiError> {
    if let Some(user) = User::find_by_google_sub(db, &profile.sub).await? {
        return Ok(user);
    }

    if let Some(user) = User::find_by_email(db, &profile.email).await? {
        User::link_google_sub(db, user.id, &profile.sub).await?;
        return Ok(User {
            google_sub: Some(profile.sub),
            ..user
        });
    }

    let user = User::create(
        db,
        CreateUser {
            email: profile.email,
            password_hash: None,
            google_sub: Some(profile.sub),
            name: profile.name,
        },
    )
    .await?;

    Settings::get_or_create(db, user.id).await?;

    tracing::info!(user_id = %user.id, "user provisioned via Google");

    Ok(user)
}

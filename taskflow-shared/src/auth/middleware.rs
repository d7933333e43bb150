/// Authentication middleware for Axum
///
/// This module provides middleware for access-token authentication in Axum
/// applications. Middleware extracts the token from the request, validates it,
/// and adds authentication context to request extensions.
///
/// # Credential Sources
///
/// - **Bearer**: `Authorization: Bearer <token>` header (API clients)
/// - **Cookie**: session cookie set at login (browser clients)
///
/// When both are present the Authorization header wins.
///
/// # Request Extensions
///
/// After successful authentication, middleware adds:
/// - `AuthContext`: Contains user_id, role, and the credential source
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskflow_shared::auth::middleware::{create_auth_middleware, AuthContext};
///
/// async fn protected_handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(protected_handler))
///     .layer(middleware::from_fn(create_auth_middleware(
///         "your-jwt-secret",
///         "taskflow_session",
///     )));
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::UserRole;

/// Where the access token was presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// Authorization header with Bearer scheme
    Bearer,

    /// Session cookie
    Cookie,
}

/// Authentication context added to request extensions
///
/// This struct is added to the request after successful authentication.
/// Handlers can extract it using Axum's `Extension` extractor.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskflow_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role carried by the token
    pub role: UserRole,

    /// Credential source used for this request
    pub source: TokenSource,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn from_claims(user_id: Uuid, role: UserRole, source: TokenSource) -> Self {
        Self {
            user_id,
            role,
            source,
        }
    }

    /// Checks whether the authenticated user is an admin
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No credentials on the request
    MissingCredentials,

    /// Credentials present but malformed
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };

        let body = Json(serde_json::json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Extracts the access token from a request
///
/// Checks the `Authorization` header first, then falls back to the named
/// session cookie. A present but non-Bearer Authorization header is an
/// error rather than a fallthrough.
///
/// # Returns
///
/// The raw token string and which source supplied it
pub fn extract_token(
    headers: &HeaderMap,
    cookie_name: &str,
) -> Result<(String, TokenSource), AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let auth_header = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Malformed authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        return Ok((token.to_string(), TokenSource::Bearer));
    }

    if let Some(cookie) = CookieJar::from_headers(headers).get(cookie_name) {
        return Ok((cookie.value().to_string(), TokenSource::Cookie));
    }

    Err(AuthError::MissingCredentials)
}

/// Access-token authentication middleware
///
/// Validates the token from the Authorization header or session cookie.
///
/// # Arguments
///
/// * `secret` - JWT secret for validation
/// * `cookie_name` - Session cookie to read when no header is present
/// * `req` - Request
/// * `next` - Next middleware/handler
///
/// # Returns
///
/// Response with `AuthContext` extension added on success
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - No credentials are present
/// - Token validation fails
/// - Token has expired
pub async fn require_auth(
    secret: String,
    cookie_name: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (token, source) = extract_token(req.headers(), &cookie_name)?;

    let claims = validate_access_token(&token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let auth_context = AuthContext::from_claims(claims.sub, claims.role, source);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Creates an authentication middleware closure
///
/// Helper function that captures the JWT secret and session cookie name
/// and returns a middleware function for `axum::middleware::from_fn`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use taskflow_shared::auth::middleware::create_auth_middleware;
///
/// let app: Router = Router::new()
///     .route("/protected", get(|| async { "OK" }))
///     .layer(middleware::from_fn(create_auth_middleware(
///         "secret",
///         "taskflow_session",
///     )));
/// ```
pub fn create_auth_middleware(
    secret: impl Into<String>,
    cookie_name: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    let secret = secret.into();
    let cookie_name = cookie_name.into();
    move |req, next| {
        let secret = secret.clone();
        let cookie_name = cookie_name.clone();
        Box::pin(require_auth(secret, cookie_name, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let headers = bearer_headers("token-abc");

        let (token, source) = extract_token(&headers, "taskflow_session").unwrap();
        assert_eq!(token, "token-abc");
        assert_eq!(source, TokenSource::Bearer);
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "other=1; taskflow_session=token-xyz".parse().unwrap(),
        );

        let (token, source) = extract_token(&headers, "taskflow_session").unwrap();
        assert_eq!(token, "token-xyz");
        assert_eq!(source, TokenSource::Cookie);
    }

    #[test]
    fn test_extract_token_header_wins_over_cookie() {
        let mut headers = bearer_headers("header-token");
        headers.insert(
            header::COOKIE,
            "taskflow_session=cookie-token".parse().unwrap(),
        );

        let (token, source) = extract_token(&headers, "taskflow_session").unwrap();
        assert_eq!(token, "header-token");
        assert_eq!(source, TokenSource::Bearer);
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();

        let result = extract_token(&headers, "taskflow_session");
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_extract_token_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());

        let result = extract_token(&headers, "taskflow_session");
        assert!(matches!(result, Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_auth_context_is_admin() {
        let admin =
            AuthContext::from_claims(Uuid::new_v4(), UserRole::Admin, TokenSource::Bearer);
        let user = AuthContext::from_claims(Uuid::new_v4(), UserRole::User, TokenSource::Cookie);

        assert!(admin.is_admin());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_auth_error_into_response() {
        let err = AuthError::MissingCredentials;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let err = AuthError::InvalidFormat("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err = AuthError::InvalidToken("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

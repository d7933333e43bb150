/// Google OAuth 2.0 sign-in module
///
/// Implements the authorization-code flow against Google's endpoints:
/// build a consent URL, exchange the returned code for an access token,
/// then fetch the user's OpenID profile (`sub`, `email`, `name`).
///
/// The `state` parameter is generated per login attempt and round-tripped
/// through a short-lived cookie to reject forged callbacks.
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::auth::oauth::{generate_state, GoogleOAuth};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let oauth = GoogleOAuth::new(
///     "client-id".to_string(),
///     "client-secret".to_string(),
///     "https://example.com/v1/auth/google/callback".to_string(),
/// )?;
///
/// let state = generate_state();
/// let url = oauth.authorize_url(&state)?;
/// // Redirect the browser to `url`; later the callback handler runs:
/// // let user = oauth.exchange_code("code-from-google").await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Error type for OAuth operations
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network or decode failure talking to Google
    #[error("OAuth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built
    #[error("Invalid OAuth URL: {0}")]
    Url(#[from] url::ParseError),

    /// Google rejected the code exchange
    #[error("Code exchange failed with status {status}: {body}")]
    Exchange { status: u16, body: String },

    /// Callback state did not match the value issued at login
    #[error("OAuth state mismatch")]
    StateMismatch,
}

/// Token endpoint response
///
/// Google also returns `expires_in`, `id_token`, and `scope`; only the
/// access token is needed to call the userinfo endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OpenID Connect profile returned by the userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    /// Google's stable account identifier
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Display name (absent for some accounts)
    #[serde(default)]
    pub name: Option<String>,
}

/// Google OAuth client
///
/// Cheap to clone; the inner HTTP client shares its connection pool.
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http: Client,
}

impl GoogleOAuth {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new client
    ///
    /// # Arguments
    ///
    /// * `client_id` - OAuth client ID from the Google Cloud console
    /// * `client_secret` - Matching client secret
    /// * `redirect_url` - Absolute callback URL registered with Google
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Result<Self, OAuthError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_url,
            http,
        })
    }

    /// Builds the consent URL the browser is redirected to
    ///
    /// Requests the `openid email profile` scopes so the callback can
    /// resolve the account by `sub` and fall back to email matching.
    pub fn authorize_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = Url::parse(GOOGLE_AUTH_URL)?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchanges an authorization code for the user's profile
    ///
    /// Performs both flow legs: code -> access token at the token
    /// endpoint, then access token -> profile at the userinfo endpoint.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Exchange` when Google rejects the code
    /// (expired, already used, or issued for another client).
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleUser, OAuthError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.http.post(GOOGLE_TOKEN_URL).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;

        self.fetch_user(&token.access_token).await
    }

    /// Fetches the OpenID profile for an access token
    async fn fetch_user(&self, access_token: &str) -> Result<GoogleUser, OAuthError> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

/// Generates a random state value for CSRF protection
///
/// 32 alphanumeric characters, cookie-safe without encoding.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GoogleOAuth {
        GoogleOAuth::new(
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:8080/v1/auth/google/callback".to_string(),
        )
        .expect("Client should build")
    }

    #[test]
    fn test_authorize_url_contains_flow_params() {
        let oauth = test_client();
        let url = oauth.authorize_url("state-123").expect("Should build URL");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("state=state-123"));
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let oauth = test_client();
        let url = oauth.authorize_url("s").expect("Should build URL");

        // The redirect URL must survive as a single query value
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fv1%2Fauth%2Fgoogle%2Fcallback"));
    }

    #[test]
    fn test_generate_state_length_and_charset() {
        let state = generate_state();

        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_state_unique() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn test_google_user_deserializes_without_name() {
        let user: GoogleUser =
            serde_json::from_str(r#"{"sub":"10769150350006150715113082367","email":"jane@example.com"}"#)
                .expect("Should deserialize");

        assert_eq!(user.email, "jane@example.com");
        assert!(user.name.is_none());
    }

    #[test]
    fn test_google_user_ignores_extra_fields() {
        let user: GoogleUser = serde_json::from_str(
            r#"{"sub":"1","email":"a@b.c","name":"Jane","picture":"https://img","email_verified":true}"#,
        )
        .expect("Should deserialize");

        assert_eq!(user.name.as_deref(), Some("Jane"));
    }
}

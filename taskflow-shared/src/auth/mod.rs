/// Authentication utilities
///
/// This module provides secure authentication primitives for TaskFlow:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
/// - [`oauth`]: Google OAuth 2.0 sign-in flow
/// - [`middleware`]: Axum middleware extracting tokens from header or cookie
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **OAuth State**: Random per-attempt state to reject forged callbacks
/// - **Constant-time Comparison**: Password verification uses constant-time operations
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::auth::jwt::{create_token, Claims, TokenType};
/// use taskflow_shared::auth::password::{hash_password, verify_password};
/// use taskflow_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// // JWT token generation
/// let claims = Claims::new(Uuid::new_v4(), UserRole::User, TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod oauth;
pub mod middleware;

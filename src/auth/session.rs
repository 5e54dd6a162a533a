//! Session issuance: login and signed session tokens.
//!
//! A session is a self-contained HS256 JWT carrying the user id and role. It is
//! checked by signature and expiry only; the role is a snapshot taken at login.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::password::{verify_dummy_blocking, verify_password_blocking};
use super::verification::normalize_email;
use crate::db::{Database, Role, User, UserRepository};
use crate::logging::mask_email;
use crate::PrepboardError;

/// Default session lifetime (5 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 5 * 60 * 60;

/// Session-related errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown email or wrong password. Both cases are reported identically.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token missing, malformed, badly signed or expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// Store failure.
    #[error(transparent)]
    Internal(#[from] PrepboardError),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// User role at issuance.
    pub role: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

impl SessionClaims {
    /// Role carried by the token.
    ///
    /// Unrecognised roles are treated as member.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Member)
    }
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_secs: u64,
}

impl SessionKeys {
    /// Create keys from a shared secret and a token lifetime.
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_secs,
        }
    }

    /// Token lifetime in seconds.
    pub fn expiry_secs(&self) -> u64 {
        self.expiry_secs
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> Result<String, SessionError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = SessionClaims {
            sub: user.id,
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.expiry_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("session token rejected: {}", e);
                SessionError::InvalidToken
            })
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed session token.
    pub token: String,
    /// The authenticated user.
    pub user: User,
    /// Landing page hint for the client.
    pub redirect: &'static str,
}

/// Check credentials and issue a session token.
pub async fn login(
    db: &Database,
    keys: &SessionKeys,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, SessionError> {
    let email = normalize_email(email);

    let Some(user) = UserRepository::new(db.pool()).get_by_email(&email).await? else {
        verify_dummy_blocking(password.to_string()).await;
        info!(email = %mask_email(&email), "login failed: unknown email");
        return Err(SessionError::InvalidCredentials);
    };

    if verify_password_blocking(password.to_string(), user.password.clone())
        .await
        .is_err()
    {
        info!(user_id = user.id, "login failed: wrong password");
        return Err(SessionError::InvalidCredentials);
    }

    let token = keys.issue(&user)?;
    info!(user_id = user.id, role = %user.role, "login succeeded");

    Ok(LoginOutcome {
        token,
        redirect: user.role.redirect_path(),
        user,
    })
}

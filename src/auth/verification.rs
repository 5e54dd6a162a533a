//! Email verification flows: signup confirmation and password reset.
//!
//! Both flows issue a six-digit code, store it with a payload and hand it to the
//! notification sink. Confirmation consumes the code inside a transaction that
//! also performs the identity write, so a failed confirmation changes nothing.

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use super::password::{hash_password_blocking, validate_password, PasswordError};
use crate::config::AuthConfig;
use crate::db::{
    unix_now, CodePayload, CodePurpose, Database, NewOneTimeCode, NewUser, OneTimeCodeRepository,
    Role, User, UserRepository,
};
use crate::logging::mask_email;
use crate::notify::NotificationSink;
use crate::PrepboardError;

/// Lowest issued code.
pub const CODE_MIN: u32 = 100_000;

/// Highest issued code.
pub const CODE_MAX: u32 = 999_999;

/// Verification flow errors.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Password does not meet requirements.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Email already belongs to an identity.
    #[error("email already registered")]
    EmailTaken,

    /// No identity for this email.
    #[error("no account with this email")]
    AccountNotFound,

    /// No outstanding code matches (email, code).
    #[error("invalid or already used code")]
    InvalidCode,

    /// The code matched but its lifetime has passed.
    #[error("code expired")]
    CodeExpired,

    /// Store failure.
    #[error(transparent)]
    Internal(#[from] PrepboardError),
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generate a six-digit code drawn uniformly from [`CODE_MIN`, `CODE_MAX`].
pub fn generate_code() -> String {
    rand::rng().random_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Signup and password-reset orchestration over the credential and code stores.
pub struct VerificationService<'a> {
    db: &'a Database,
    config: &'a AuthConfig,
    notifier: &'a dyn NotificationSink,
}

impl<'a> VerificationService<'a> {
    /// Create a new service instance.
    pub fn new(
        db: &'a Database,
        config: &'a AuthConfig,
        notifier: &'a dyn NotificationSink,
    ) -> Self {
        Self {
            db,
            config,
            notifier,
        }
    }

    /// Start a signup: store the pending identity with a fresh code and send it.
    pub async fn request_signup_code(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), VerificationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VerificationError::Validation("name is required".into()));
        }
        let email = normalize_email(email);
        validate_password(password)?;

        if UserRepository::new(self.db.pool())
            .email_exists(&email)
            .await?
        {
            info!(email = %mask_email(&email), "signup rejected: email already registered");
            return Err(VerificationError::EmailTaken);
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        self.issue_code(
            &email,
            CodePayload::Signup {
                name: name.to_string(),
                password_hash,
            },
        )
        .await
    }

    /// Complete a signup with a previously issued code.
    ///
    /// The identity gets the admin role iff the email is the configured admin address.
    pub async fn confirm_signup(&self, email: &str, code: &str) -> Result<User, VerificationError> {
        let email = normalize_email(email);
        let mut tx = self.db.begin().await?;

        let row = OneTimeCodeRepository::consume_in(&mut tx, &email, code.trim(), CodePurpose::Signup)
            .await?
            .ok_or(VerificationError::InvalidCode)?;

        if row.is_expired_at(unix_now()) {
            OneTimeCodeRepository::delete_all_in(&mut tx, &email).await?;
            tx.commit().await.map_err(PrepboardError::from)?;
            info!(email = %mask_email(&email), "signup confirmation with expired code");
            return Err(VerificationError::CodeExpired);
        }

        let Some(CodePayload::Signup {
            name,
            password_hash,
        }) = row.payload()
        else {
            return Err(PrepboardError::Database("signup code without pending data".into()).into());
        };

        let role = if self.config.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::Member
        };
        let new_user = NewUser::new(name, email.as_str(), password_hash).with_role(role);

        let user = match UserRepository::create_in(&mut tx, &new_user).await {
            Ok(user) => user,
            Err(e) if e.is_unique_violation() => return Err(VerificationError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        OneTimeCodeRepository::delete_all_in(&mut tx, &email).await?;
        tx.commit().await.map_err(PrepboardError::from)?;

        info!(user_id = user.id, role = %user.role, "signup confirmed");
        Ok(user)
    }

    /// Start a password reset for an existing identity.
    pub async fn request_password_reset_code(&self, email: &str) -> Result<(), VerificationError> {
        let email = normalize_email(email);

        if !UserRepository::new(self.db.pool())
            .email_exists(&email)
            .await?
        {
            info!(email = %mask_email(&email), "password reset requested for unknown account");
            return Err(VerificationError::AccountNotFound);
        }

        self.issue_code(&email, CodePayload::Reset).await
    }

    /// Complete a password reset with a previously issued code.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), VerificationError> {
        let email = normalize_email(email);
        validate_password(new_password)?;
        let password_hash = hash_password_blocking(new_password.to_string()).await?;

        let mut tx = self.db.begin().await?;

        let row = OneTimeCodeRepository::consume_in(&mut tx, &email, code.trim(), CodePurpose::Reset)
            .await?
            .ok_or(VerificationError::InvalidCode)?;

        if row.is_expired_at(unix_now()) {
            OneTimeCodeRepository::delete_all_in(&mut tx, &email).await?;
            tx.commit().await.map_err(PrepboardError::from)?;
            info!(email = %mask_email(&email), "password reset with expired code");
            return Err(VerificationError::CodeExpired);
        }

        if !UserRepository::update_password_in(&mut tx, &email, &password_hash).await? {
            return Err(VerificationError::AccountNotFound);
        }

        OneTimeCodeRepository::delete_all_in(&mut tx, &email).await?;
        tx.commit().await.map_err(PrepboardError::from)?;

        info!(email = %mask_email(&email), "password reset completed");
        Ok(())
    }

    /// Store a new code for the email and hand it to the notification sink.
    ///
    /// Expired codes of other emails are left alone so their owners still see
    /// CodeExpired. A failed send is logged, not returned.
    async fn issue_code(&self, email: &str, payload: CodePayload) -> Result<(), VerificationError> {
        let repo = OneTimeCodeRepository::new(self.db.pool());
        let now = unix_now();

        let purpose = payload.purpose();
        let code = generate_code();
        repo.create(&NewOneTimeCode {
            email: email.to_string(),
            code: code.clone(),
            payload,
            expires_at: now + self.config.code_ttl_minutes * 60,
        })
        .await?;

        if let Err(e) = self.notifier.send_code(email, &code, purpose).await {
            warn!(email = %mask_email(email), %purpose, error = %e, "failed to deliver one-time code");
        }

        info!(
            email = %mask_email(email),
            %purpose,
            ttl_minutes = self.config.code_ttl_minutes,
            "one-time code issued"
        );
        Ok(())
    }
}

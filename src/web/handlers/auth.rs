//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::assistant::Assistant;
use crate::auth::{self, SessionKeys, VerificationService};
use crate::config::Config;
use crate::notify::NotificationSink;
use crate::web::dto::{
    ForgotConfirmRequest, ForgotRequestCodeRequest, LoginRequest, LoginResponse, MessageResponse,
    SignupConfirmRequest, SignupRequestCodeRequest, UserInfo, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Configuration read at startup.
    pub config: Arc<Config>,
    /// Session token keys.
    pub keys: Arc<SessionKeys>,
    /// Where one-time codes are sent.
    pub notifier: Arc<dyn NotificationSink>,
    /// Summary and question generation.
    pub assistant: Assistant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Database,
        config: Config,
        notifier: Arc<dyn NotificationSink>,
        assistant: Assistant,
    ) -> Self {
        let keys = Arc::new(SessionKeys::new(
            &config.auth.jwt_secret,
            config.auth.session_expiry_secs,
        ));
        Self {
            db,
            config: Arc::new(config),
            keys,
            notifier,
            assistant,
        }
    }

    fn verification(&self) -> VerificationService<'_> {
        VerificationService::new(&self.db, &self.config.auth, self.notifier.as_ref())
    }
}

/// POST /api/auth/signup/request-code - Start a signup.
pub async fn signup_request_code(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignupRequestCodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .verification()
        .request_signup_code(&req.name, &req.email, &req.password)
        .await?;

    Ok(Json(MessageResponse::new("OTP sent to email")))
}

/// POST /api/auth/signup/confirm-code - Finish a signup.
pub async fn signup_confirm_code(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignupConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .verification()
        .confirm_signup(&req.email, &req.code)
        .await?;

    Ok(Json(MessageResponse::new("Signup successful")))
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = auth::login(&state.db, &state.keys, &req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        expires_in: state.keys.expiry_secs(),
        user: UserInfo::from(&outcome.user),
        redirect: outcome.redirect.to_string(),
    }))
}

/// POST /api/auth/forgot/request-code - Start a password reset.
pub async fn forgot_request_code(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ForgotRequestCodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .verification()
        .request_password_reset_code(&req.email)
        .await?;

    Ok(Json(MessageResponse::new(
        "OTP sent to email for password reset",
    )))
}

/// POST /api/auth/forgot/confirm-reset - Set a new password with a code.
pub async fn forgot_confirm_reset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ForgotConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .verification()
        .confirm_password_reset(&req.email, &req.code, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new(
        "Password reset successful. Please login.",
    )))
}

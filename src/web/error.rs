//! API error handling.
//!
//! Every domain error is mapped here to an HTTP status and a user-safe message.
//! Infrastructure failures are logged with detail and answered with a generic
//! 500 body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::assistant::AssistantError;
use crate::auth::{PasswordError, SessionError, VerificationError};
use crate::submission::ModerationError;
use crate::PrepboardError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request body (400).
    BadRequest,
    /// Input failed validation (400).
    ValidationError,
    /// Email already registered (400).
    Conflict,
    /// No account for the given email (400).
    AccountNotFound,
    /// Unknown email or wrong password (400).
    InvalidCredentials,
    /// No outstanding code matches (400).
    InvalidCode,
    /// Code matched but has expired (400).
    CodeExpired,
    /// Missing, invalid or expired session token (401).
    Unauthorized,
    /// Authenticated but not allowed (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Rate limit exceeded (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
    /// Text-generation service failed (502).
    UpstreamUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest
            | ErrorCode::ValidationError
            | ErrorCode::Conflict
            | ErrorCode::AccountNotFound
            | ErrorCode::InvalidCredentials
            | ErrorCode::InvalidCode
            | ErrorCode::CodeExpired => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message, kept at the top level for simple clients.
    pub msg: String,
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation error details (only present for validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a validation error with a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a rate limit error.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Create an upstream failure error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamUnavailable, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a validation error from validator::ValidationErrors.
    ///
    /// The top-level message is the first field message in field order.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        let message = details
            .values()
            .flat_map(|v| v.first())
            .next()
            .cloned()
            .unwrap_or_else(|| "Validation failed".to_string());

        Self {
            code: ErrorCode::ValidationError,
            message,
            details: Some(details),
        }
    }

    fn server_error(err: &dyn std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        ApiError::internal("Server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            msg: self.message.clone(),
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<PrepboardError> for ApiError {
    fn from(err: PrepboardError) -> Self {
        match &err {
            PrepboardError::NotFound(_) => ApiError::not_found("Not found"),
            PrepboardError::Validation(msg) => ApiError::validation(msg.clone()),
            _ => ApiError::server_error(&err),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort | PasswordError::TooLong => {
                let mut msg = err.to_string();
                if let Some(first) = msg.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                ApiError::validation(msg)
            }
            other => ApiError::server_error(&other),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Validation(msg) => ApiError::validation(msg),
            VerificationError::Password(e) => e.into(),
            VerificationError::EmailTaken => {
                ApiError::new(ErrorCode::Conflict, "User already exists")
            }
            VerificationError::AccountNotFound => {
                ApiError::new(ErrorCode::AccountNotFound, "No account with this email")
            }
            VerificationError::InvalidCode => ApiError::new(ErrorCode::InvalidCode, "Invalid OTP"),
            VerificationError::CodeExpired => ApiError::new(ErrorCode::CodeExpired, "OTP expired"),
            VerificationError::Internal(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => {
                ApiError::new(ErrorCode::InvalidCredentials, "Invalid credentials")
            }
            SessionError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
            SessionError::Internal(e) => e.into(),
            other => ApiError::server_error(&other),
        }
    }
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::Validation(msg) => ApiError::validation(msg),
            ModerationError::Forbidden => ApiError::forbidden("Not allowed"),
            ModerationError::NotFound => ApiError::not_found("Not found"),
            ModerationError::Upstream(e) => e.into(),
            ModerationError::Internal(e) => e.into(),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        tracing::warn!(error = %err, "text generation failed");
        ApiError::upstream("Upstream unavailable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::UpstreamUnavailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_verification_mapping() {
        let err: ApiError = VerificationError::EmailTaken.into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "User already exists");

        let err: ApiError = VerificationError::InvalidCode.into();
        assert_eq!(err.message, "Invalid OTP");

        let err: ApiError = VerificationError::CodeExpired.into();
        assert_eq!(err.message, "OTP expired");

        let err: ApiError = VerificationError::Password(PasswordError::TooShort).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Password must be at least 8 characters");
    }

    #[test]
    fn test_session_mapping() {
        let err: ApiError = SessionError::InvalidCredentials.into();
        assert_eq!(err.code.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid credentials");

        let err: ApiError = SessionError::InvalidToken.into();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_moderation_mapping() {
        let err: ApiError = ModerationError::Forbidden.into();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err: ApiError = ModerationError::NotFound.into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ApiError = ModerationError::Upstream(AssistantError::Status(503)).into();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err: ApiError = PrepboardError::Database("disk I/O error at page 7".into()).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, "Server error");
    }
}

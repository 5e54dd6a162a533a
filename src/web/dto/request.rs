//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::no_control_chars;
use crate::submission::Round;

/// Signup step one: request a code.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequestCodeRequest {
    /// Display name.
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1 to 100 characters"),
        custom(function = "no_control_chars")
    )]
    pub name: String,
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password (length is checked by the verification service).
    pub password: String,
}

/// Signup step two: confirm with the emailed code.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupConfirmRequest {
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// One-time code.
    #[serde(alias = "otp")]
    pub code: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Password reset step one: request a code.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotRequestCodeRequest {
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Password reset step two: confirm with the code and set a new password.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotConfirmRequest {
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// One-time code.
    #[serde(alias = "otp")]
    pub code: String,
    /// New password.
    pub new_password: String,
}

/// Year as sent by clients: either a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearInput {
    Number(i64),
    Text(String),
}

impl YearInput {
    /// Raw text form for validation.
    pub fn into_raw(self) -> String {
        match self {
            YearInput::Number(n) => n.to_string(),
            YearInput::Text(s) => s,
        }
    }
}

/// Create a submission.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    /// Company name.
    #[validate(custom(function = "no_control_chars"))]
    #[serde(default)]
    pub name: String,
    /// Interview rounds in order.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Interview year.
    #[serde(default)]
    pub year: Option<YearInput>,
    /// College.
    #[serde(default)]
    pub college: Option<String>,
}

/// Reject a submission.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectRequest {
    /// Reason shown to the author.
    #[serde(default)]
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

/// Query string for submission lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of the company name.
    #[serde(default)]
    pub search: Option<String>,
    /// Status filter (admin only).
    #[serde(default)]
    pub status: Option<String>,
}

//! Response DTOs for Web API.

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::db::User;
use crate::submission::{Round, Submission, SubmissionStatus};

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub msg: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// User role.
    pub role: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Session token (JWT).
    pub token: String,
    /// Token lifetime in seconds.
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
    /// User information.
    pub user: UserInfo,
    /// Landing page for the user's role.
    pub redirect: String,
}

/// Submission as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub rounds: Vec<Round>,
    /// Derived from `rounds`, never stored.
    pub rounds_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    pub status: SubmissionStatus,
    pub rejection_reason: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        let created_at = Utc
            .timestamp_opt(s.created_at, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        Self {
            rounds_count: s.rounds_count(),
            id: s.id,
            owner_id: s.owner_id,
            name: s.name,
            rounds: s.rounds,
            year: s.year,
            college: s.college,
            status: s.status,
            rejection_reason: s.rejection_reason,
            created_at,
        }
    }
}

/// A message together with the affected submission.
#[derive(Debug, Serialize)]
pub struct SubmissionEnvelope {
    /// Human-readable message.
    pub msg: String,
    /// The affected submission.
    pub submission: SubmissionResponse,
}

impl SubmissionEnvelope {
    /// Create a new envelope.
    pub fn new(msg: impl Into<String>, submission: Submission) -> Self {
        Self {
            msg: msg.into(),
            submission: submission.into(),
        }
    }
}

/// Generated summary.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Bullet lines separated by newlines.
    pub summary: String,
}

/// Generated questions.
#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    /// Exactly the configured number of questions.
    pub questions: Vec<String>,
}

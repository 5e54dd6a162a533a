//! Submission types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Role;

/// Error returned when a status string is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown submission status: {0}")]
pub struct ParseStatusError(pub String);

/// Moderation status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting for an administrator.
    #[default]
    Pending,
    /// Publicly visible.
    Approved,
    /// Hidden from everyone but the owner and administrators.
    Rejected,
}

impl SubmissionStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = ParseStatusError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Outcome of a single interview round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    #[default]
    Pending,
    Pass,
    Fail,
    Selected,
}

/// One interview round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Round {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub result: RoundResult,
}

/// Interview-experience submission.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Submission {
    /// Submission ID.
    pub id: i64,
    /// ID of the user who created it.
    pub owner_id: i64,
    /// Company name.
    pub name: String,
    /// Rounds in order.
    #[sqlx(json)]
    pub rounds: Vec<Round>,
    /// Interview year.
    pub year: Option<i32>,
    /// Candidate's college.
    pub college: Option<String>,
    /// Moderation status.
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    /// Reason given on rejection; empty otherwise.
    pub rejection_reason: String,
    /// Creation time (unix seconds).
    pub created_at: i64,
}

impl Submission {
    /// Number of rounds.
    pub fn rounds_count(&self) -> usize {
        self.rounds.len()
    }

    /// Check whether the caller may see this submission.
    ///
    /// Admins see everything, owners see their own, everyone sees approved.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        caller.is_admin()
            || self.status == SubmissionStatus::Approved
            || self.owner_id == caller.id
    }

    /// Flatten the record into the plain text handed to the assistant.
    pub fn experience_text(&self) -> String {
        let mut lines = vec![format!("Company: {}", self.name)];
        if let Some(year) = self.year {
            lines.push(format!("Year: {year}"));
        }
        if let Some(college) = self.college.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("College: {college}"));
        }
        lines.push(String::new());
        lines.push("Rounds:".to_string());
        for (i, round) in self.rounds.iter().enumerate() {
            let title = if round.title.is_empty() {
                format!("Round {}", i + 1)
            } else {
                round.title.clone()
            };
            lines.push(format!("- {}: {}", title, round.notes));
        }
        lines.join("\n")
    }
}

/// Data for creating a submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub owner_id: i64,
    pub name: String,
    pub rounds: Vec<Round>,
    pub year: Option<i32>,
    pub college: Option<String>,
}

/// Case-fold a company name for search.
///
/// Full Unicode lowercasing, unlike SQLite's ASCII-only `lower()`.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Filter for listing submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    /// Only this status.
    pub status: Option<SubmissionStatus>,
    /// Only this owner.
    pub owner_id: Option<i64>,
    /// Case-folded substring of the name.
    pub search: Option<String>,
}

impl SubmissionFilter {
    /// Empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a status.
    pub fn status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to an owner.
    pub fn owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Restrict to names containing the term. Blank terms are ignored.
    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(fold_name);
        self
    }
}

/// Authenticated identity performing a moderation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl Caller {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

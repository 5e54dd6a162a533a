//! Moderation engine.
//!
//! Every read and write over submissions goes through [`ModerationService`],
//! which decides from the caller's role and id plus the submission's status and
//! owner what the caller may see or change.

use chrono::Datelike;
use thiserror::Error;
use tracing::info;

use super::repository::SubmissionRepository;
use super::types::{
    Caller, NewSubmission, Round, Submission, SubmissionFilter, SubmissionStatus,
};
use crate::assistant::{Assistant, AssistantError};
use crate::db::Database;
use crate::PrepboardError;

/// Earliest accepted interview year.
pub const MIN_YEAR: i32 = 2000;

/// Maximum length of a company name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Moderation errors.
#[derive(Error, Debug)]
pub enum ModerationError {
    /// Bad input shape or range.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller may not perform this operation on this submission.
    #[error("not allowed")]
    Forbidden,

    /// No submission with this ID.
    #[error("submission not found")]
    NotFound,

    /// The text-generation service failed.
    #[error("assistant unavailable: {0}")]
    Upstream(#[from] AssistantError),

    /// Store failure.
    #[error(transparent)]
    Internal(#[from] PrepboardError),
}

/// Submission as entered by its author, before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmissionDraft {
    pub name: String,
    pub rounds: Vec<Round>,
    /// Raw year input; blank means absent.
    pub year: Option<String>,
    pub college: Option<String>,
}

/// Validate an optional year against `[MIN_YEAR, current_year + 1]`.
///
/// A missing or blank input is no year.
pub fn validate_year(input: Option<&str>, current_year: i32) -> Result<Option<i32>, ModerationError> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let max = current_year + 1;
    match raw.parse::<i32>() {
        Ok(year) if (MIN_YEAR..=max).contains(&year) => Ok(Some(year)),
        _ => Err(ModerationError::Validation(format!(
            "Year must be between {MIN_YEAR} and {max}"
        ))),
    }
}

/// Visibility and moderation rules over the submission store.
pub struct ModerationService<'a> {
    db: &'a Database,
}

impl<'a> ModerationService<'a> {
    /// Create a new moderation service.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn repo(&self) -> SubmissionRepository<'_> {
        SubmissionRepository::new(self.db.pool())
    }

    fn require_admin(caller: &Caller) -> Result<(), ModerationError> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(ModerationError::Forbidden)
        }
    }

    /// Public listing.
    ///
    /// Admins see every status and may narrow by a recognised status; an
    /// unrecognised filter is ignored. Everyone else only sees approved records.
    pub async fn list_public(
        &self,
        caller: &Caller,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Submission>, ModerationError> {
        let mut filter = SubmissionFilter::new().search(search);
        if caller.is_admin() {
            if let Some(status) = status.and_then(|s| s.parse::<SubmissionStatus>().ok()) {
                filter = filter.status(status);
            }
        } else {
            filter = filter.status(SubmissionStatus::Approved);
        }

        Ok(self.repo().list(&filter).await?)
    }

    /// The caller's own submissions in any status.
    pub async fn list_mine(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Submission>, ModerationError> {
        let filter = SubmissionFilter::new().owner(caller.id).search(search);
        Ok(self.repo().list(&filter).await?)
    }

    /// Pending submissions, newest first. Admin only.
    pub async fn list_pending(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Submission>, ModerationError> {
        Self::require_admin(caller)?;
        let filter = SubmissionFilter::new()
            .status(SubmissionStatus::Pending)
            .search(search);
        Ok(self.repo().list(&filter).await?)
    }

    /// Fetch one submission the caller is allowed to see.
    pub async fn get_one(&self, caller: &Caller, id: i64) -> Result<Submission, ModerationError> {
        let submission = self
            .repo()
            .get_by_id(id)
            .await?
            .ok_or(ModerationError::NotFound)?;

        if !submission.is_visible_to(caller) {
            info!(id, caller = caller.id, "submission access denied");
            return Err(ModerationError::Forbidden);
        }
        Ok(submission)
    }

    /// Create a submission owned by the caller. It always starts pending.
    pub async fn create(
        &self,
        caller: &Caller,
        draft: SubmissionDraft,
    ) -> Result<Submission, ModerationError> {
        self.create_in_year(caller, draft, chrono::Utc::now().year())
            .await
    }

    /// [`ModerationService::create`] with an explicit calendar year.
    pub async fn create_in_year(
        &self,
        caller: &Caller,
        draft: SubmissionDraft,
        current_year: i32,
    ) -> Result<Submission, ModerationError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ModerationError::Validation("Name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ModerationError::Validation(format!(
                "Name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        let year = validate_year(draft.year.as_deref(), current_year)?;
        let college = draft
            .college
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let submission = self
            .repo()
            .create(&NewSubmission {
                owner_id: caller.id,
                name: name.to_string(),
                rounds: draft.rounds,
                year,
                college,
            })
            .await?;

        info!(
            id = submission.id,
            owner = caller.id,
            rounds = submission.rounds_count(),
            "submission created"
        );
        Ok(submission)
    }

    /// Approve a submission and clear any rejection reason. Admin only.
    ///
    /// Approving an approved submission succeeds without change.
    pub async fn approve(&self, caller: &Caller, id: i64) -> Result<Submission, ModerationError> {
        Self::require_admin(caller)?;
        let submission = self
            .repo()
            .set_status(id, SubmissionStatus::Approved, "")
            .await?
            .ok_or(ModerationError::NotFound)?;

        info!(id, admin = caller.id, "submission approved");
        Ok(submission)
    }

    /// Reject a submission with an optional reason. Admin only.
    pub async fn reject(
        &self,
        caller: &Caller,
        id: i64,
        reason: Option<&str>,
    ) -> Result<Submission, ModerationError> {
        Self::require_admin(caller)?;
        let reason = reason.unwrap_or_default();
        let submission = self
            .repo()
            .set_status(id, SubmissionStatus::Rejected, reason)
            .await?
            .ok_or(ModerationError::NotFound)?;

        info!(id, admin = caller.id, reason_len = reason.len(), "submission rejected");
        Ok(submission)
    }

    /// Permanently delete a submission. Admin only.
    pub async fn delete(&self, caller: &Caller, id: i64) -> Result<(), ModerationError> {
        Self::require_admin(caller)?;
        if !self.repo().delete(id).await? {
            return Err(ModerationError::NotFound);
        }

        info!(id, admin = caller.id, "submission deleted");
        Ok(())
    }

    /// Bullet summary of a submission the caller may see.
    pub async fn summarize(
        &self,
        caller: &Caller,
        id: i64,
        assistant: &Assistant,
    ) -> Result<String, ModerationError> {
        let submission = self.get_one(caller, id).await?;
        let summary = assistant.summarize(&submission.experience_text()).await?;
        info!(id, "summary generated");
        Ok(summary)
    }

    /// Suggested questions for a submission the caller may see.
    pub async fn suggest_questions(
        &self,
        caller: &Caller,
        id: i64,
        assistant: &Assistant,
    ) -> Result<Vec<String>, ModerationError> {
        let submission = self.get_one(caller, id).await?;
        let questions = assistant
            .suggest_questions(&submission.experience_text())
            .await?;
        info!(id, count = questions.len(), "questions generated");
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::assistant::TextGenerator;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::submission::types::RoundResult;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
            if prompt.contains("JSON array") {
                Ok(r#"["Q1","Q2"]"#.to_string())
            } else {
                Ok("- summarized".to_string())
            }
        }
    }

    struct Down;

    #[async_trait]
    impl TextGenerator for Down {
        async fn generate(&self, _prompt: &str) -> Result<String, AssistantError> {
            Err(AssistantError::Status(503))
        }
    }

    struct Fixture {
        db: Database,
        admin: Caller,
        m1: Caller,
        m2: Caller,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let admin = users
            .create(&NewUser::new("Admin", "admin@example.com", "hash").with_role(Role::Admin))
            .await
            .unwrap();
        let m1 = users
            .create(&NewUser::new("M1", "m1@example.com", "hash"))
            .await
            .unwrap();
        let m2 = users
            .create(&NewUser::new("M2", "m2@example.com", "hash"))
            .await
            .unwrap();
        Fixture {
            db,
            admin: Caller::new(admin.id, Role::Admin),
            m1: Caller::new(m1.id, Role::Member),
            m2: Caller::new(m2.id, Role::Member),
        }
    }

    fn acme() -> SubmissionDraft {
        SubmissionDraft {
            name: "Acme".to_string(),
            rounds: vec![Round {
                title: "R1".to_string(),
                notes: "x".to_string(),
                result: RoundResult::Pending,
            }],
            year: None,
            college: None,
        }
    }

    #[test]
    fn test_validate_year() {
        assert_eq!(validate_year(None, 2024).unwrap(), None);
        assert_eq!(validate_year(Some("  "), 2024).unwrap(), None);
        assert_eq!(validate_year(Some("2025"), 2024).unwrap(), Some(2025));
        assert_eq!(validate_year(Some("2000"), 2024).unwrap(), Some(2000));
        assert!(validate_year(Some("1999"), 2024).is_err());
        assert!(validate_year(Some("2026"), 2024).is_err());
        assert!(validate_year(Some("2031"), 2024).is_err());
        assert!(validate_year(Some("twenty"), 2024).is_err());
    }

    #[tokio::test]
    async fn test_create_is_pending_and_visible_to_owner_only() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);

        let s = svc.create(&f.m1, acme()).await.unwrap();
        assert_eq!(s.status, SubmissionStatus::Pending);
        assert_eq!(s.rounds_count(), 1);
        assert_eq!(s.owner_id, f.m1.id);

        let mine = svc.list_mine(&f.m1, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(svc.list_public(&f.m2, None, None).await.unwrap().is_empty());
        assert!(svc
            .list_public(&f.m2, Some("pending"), Some("acme"))
            .await
            .unwrap()
            .is_empty());

        assert!(matches!(
            svc.get_one(&f.m2, s.id).await,
            Err(ModerationError::Forbidden)
        ));
        assert!(svc.get_one(&f.m1, s.id).await.is_ok());
        assert!(svc.get_one(&f.admin, s.id).await.is_ok());

        svc.approve(&f.admin, s.id).await.unwrap();
        let public = svc.list_public(&f.m2, None, None).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, s.id);
    }

    #[tokio::test]
    async fn test_admin_create_is_also_pending() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let s = svc.create(&f.admin, acme()).await.unwrap();
        assert_eq!(s.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);

        let blank = SubmissionDraft {
            name: "   ".to_string(),
            ..acme()
        };
        assert!(matches!(
            svc.create(&f.m1, blank).await,
            Err(ModerationError::Validation(_))
        ));

        let old = SubmissionDraft {
            year: Some("1999".to_string()),
            ..acme()
        };
        assert!(matches!(
            svc.create_in_year(&f.m1, old, 2024).await,
            Err(ModerationError::Validation(_))
        ));

        let future = SubmissionDraft {
            year: Some("2031".to_string()),
            ..acme()
        };
        assert!(svc.create_in_year(&f.m1, future, 2024).await.is_err());

        let ok = SubmissionDraft {
            name: "  Acme  ".to_string(),
            year: Some("2025".to_string()),
            college: Some("   ".to_string()),
            ..acme()
        };
        let s = svc.create_in_year(&f.m1, ok, 2024).await.unwrap();
        assert_eq!(s.name, "Acme");
        assert_eq!(s.year, Some(2025));
        assert_eq!(s.college, None);
    }

    #[tokio::test]
    async fn test_owner_sees_rejected() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let s = svc.create(&f.m1, acme()).await.unwrap();
        svc.reject(&f.admin, s.id, Some("weak answers")).await.unwrap();

        let fetched = svc.get_one(&f.m1, s.id).await.unwrap();
        assert_eq!(fetched.status, SubmissionStatus::Rejected);
        assert_eq!(fetched.rejection_reason, "weak answers");
        assert!(matches!(
            svc.get_one(&f.m2, s.id).await,
            Err(ModerationError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_reject_then_approve_clears_reason() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let s = svc.create(&f.m1, acme()).await.unwrap();

        let rejected = svc.reject(&f.admin, s.id, Some("weak answers")).await.unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert_eq!(rejected.rejection_reason, "weak answers");

        let approved = svc.approve(&f.admin, s.id).await.unwrap();
        assert_eq!(approved.status, SubmissionStatus::Approved);
        assert_eq!(approved.rejection_reason, "");

        // Idempotent
        let again = svc.approve(&f.admin, s.id).await.unwrap();
        assert_eq!(again.status, SubmissionStatus::Approved);
        assert_eq!(again.rejection_reason, "");

        // Approved records may be rejected again.
        let rejected = svc.reject(&f.admin, s.id, None).await.unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert_eq!(rejected.rejection_reason, "");
    }

    #[tokio::test]
    async fn test_admin_only_operations() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let s = svc.create(&f.m1, acme()).await.unwrap();

        assert!(matches!(
            svc.approve(&f.m1, s.id).await,
            Err(ModerationError::Forbidden)
        ));
        assert!(matches!(
            svc.reject(&f.m1, s.id, None).await,
            Err(ModerationError::Forbidden)
        ));
        assert!(matches!(
            svc.delete(&f.m1, s.id).await,
            Err(ModerationError::Forbidden)
        ));
        assert!(matches!(
            svc.list_pending(&f.m1, None).await,
            Err(ModerationError::Forbidden)
        ));

        let unchanged = svc.get_one(&f.m1, s.id).await.unwrap();
        assert_eq!(unchanged.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_not_found() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);

        assert!(matches!(
            svc.get_one(&f.admin, 999).await,
            Err(ModerationError::NotFound)
        ));
        assert!(matches!(
            svc.approve(&f.admin, 999).await,
            Err(ModerationError::NotFound)
        ));
        assert!(matches!(
            svc.reject(&f.admin, 999, None).await,
            Err(ModerationError::NotFound)
        ));
        assert!(matches!(
            svc.delete(&f.admin, 999).await,
            Err(ModerationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_admin_status_filter() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let a = svc.create(&f.m1, acme()).await.unwrap();
        let b = svc.create(&f.m2, acme()).await.unwrap();
        svc.approve(&f.admin, b.id).await.unwrap();

        assert_eq!(svc.list_public(&f.admin, None, None).await.unwrap().len(), 2);
        let pending = svc
            .list_public(&f.admin, Some("pending"), None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        // Unknown filter is ignored
        assert_eq!(
            svc.list_public(&f.admin, Some("bogus"), None)
                .await
                .unwrap()
                .len(),
            2
        );

        let queue = svc.list_pending(&f.admin, None).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, a.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let s = svc.create(&f.m1, acme()).await.unwrap();

        svc.delete(&f.admin, s.id).await.unwrap();
        assert!(matches!(
            svc.get_one(&f.m1, s.id).await,
            Err(ModerationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_assistant_views_follow_visibility() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let assistant = Assistant::new(Arc::new(Echo), Duration::from_secs(5), 3);
        let s = svc.create(&f.m1, acme()).await.unwrap();

        assert!(matches!(
            svc.summarize(&f.m2, s.id, &assistant).await,
            Err(ModerationError::Forbidden)
        ));
        assert!(matches!(
            svc.suggest_questions(&f.m2, s.id, &assistant).await,
            Err(ModerationError::Forbidden)
        ));

        assert_eq!(
            svc.summarize(&f.m1, s.id, &assistant).await.unwrap(),
            "- summarized"
        );
        let questions = svc
            .suggest_questions(&f.admin, s.id, &assistant)
            .await
            .unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], "Q1");
    }

    #[tokio::test]
    async fn test_assistant_failure_is_upstream() {
        let f = setup().await;
        let svc = ModerationService::new(&f.db);
        let assistant = Assistant::new(Arc::new(Down), Duration::from_secs(5), 3);
        let s = svc.create(&f.m1, acme()).await.unwrap();

        assert!(matches!(
            svc.summarize(&f.m1, s.id, &assistant).await,
            Err(ModerationError::Upstream(_))
        ));
        assert!(matches!(
            svc.suggest_questions(&f.m1, s.id, &assistant).await,
            Err(ModerationError::Upstream(_))
        ));
    }
}

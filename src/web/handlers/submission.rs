//! Submission handlers for Web API.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::submission::{ModerationError, ModerationService, Submission, SubmissionDraft};
use crate::web::dto::{
    CreateSubmissionRequest, ListQuery, MessageResponse, QuestionsResponse, RejectRequest,
    SubmissionEnvelope, SubmissionId, SubmissionResponse, SummaryResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AdminUser, AuthUser};

fn to_responses(submissions: Vec<Submission>) -> Json<Vec<SubmissionResponse>> {
    Json(submissions.into_iter().map(Into::into).collect())
}

/// Map a generation failure to a 502 with a view-specific message.
fn upstream_as(err: ModerationError, message: &str) -> ApiError {
    match err {
        ModerationError::Upstream(e) => {
            tracing::warn!(error = %e, "{}", message);
            ApiError::upstream(message)
        }
        other => other.into(),
    }
}

/// POST /api/submissions - Submit an experience for approval.
pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionEnvelope>), ApiError> {
    let draft = SubmissionDraft {
        name: req.name,
        rounds: req.rounds,
        year: req.year.map(|y| y.into_raw()),
        college: req.college,
    };

    let submission = ModerationService::new(&state.db)
        .create(&auth.caller(), draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionEnvelope::new("Submitted for approval", submission)),
    ))
}

/// GET /api/submissions - Public listing.
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = ModerationService::new(&state.db)
        .list_public(
            &auth.caller(),
            query.status.as_deref(),
            query.search.as_deref(),
        )
        .await?;

    Ok(to_responses(submissions))
}

/// GET /api/submissions/mine - The caller's own submissions.
pub async fn list_my_submissions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = ModerationService::new(&state.db)
        .list_mine(&auth.caller(), query.search.as_deref())
        .await?;

    Ok(to_responses(submissions))
}

/// GET /api/submissions/pending - Moderation queue.
pub async fn list_pending_submissions(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = ModerationService::new(&state.db)
        .list_pending(&admin.caller(), query.search.as_deref())
        .await?;

    Ok(to_responses(submissions))
}

/// GET /api/submissions/:id - One submission.
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    SubmissionId(id): SubmissionId,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = ModerationService::new(&state.db)
        .get_one(&auth.caller(), id)
        .await?;

    Ok(Json(submission.into()))
}

/// GET /api/submissions/:id/summary - Generated bullet summary.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    SubmissionId(id): SubmissionId,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = ModerationService::new(&state.db)
        .summarize(&auth.caller(), id, &state.assistant)
        .await
        .map_err(|e| upstream_as(e, "Summary unavailable"))?;

    Ok(Json(SummaryResponse { summary }))
}

/// GET /api/submissions/:id/suggested-questions - Generated practice questions.
pub async fn get_suggested_questions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    SubmissionId(id): SubmissionId,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let questions = ModerationService::new(&state.db)
        .suggest_questions(&auth.caller(), id, &state.assistant)
        .await
        .map_err(|e| upstream_as(e, "Suggestions unavailable"))?;

    Ok(Json(QuestionsResponse { questions }))
}

/// PATCH /api/submissions/:id/approve - Approve (admin).
pub async fn approve_submission(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    SubmissionId(id): SubmissionId,
) -> Result<Json<SubmissionEnvelope>, ApiError> {
    let submission = ModerationService::new(&state.db)
        .approve(&admin.caller(), id)
        .await?;

    Ok(Json(SubmissionEnvelope::new("Approved", submission)))
}

/// PATCH /api/submissions/:id/reject - Reject (admin).
///
/// The body is optional; without one the reason is empty.
pub async fn reject_submission(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    SubmissionId(id): SubmissionId,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<SubmissionEnvelope>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate().map_err(ApiError::from_validation_errors)?;

    let submission = ModerationService::new(&state.db)
        .reject(&admin.caller(), id, req.reason.as_deref())
        .await?;

    Ok(Json(SubmissionEnvelope::new("Rejected", submission)))
}

/// DELETE /api/submissions/:id - Delete permanently (admin).
pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    SubmissionId(id): SubmissionId,
) -> Result<Json<MessageResponse>, ApiError> {
    ModerationService::new(&state.db)
        .delete(&admin.caller(), id)
        .await?;

    Ok(Json(MessageResponse::new("Deleted")))
}

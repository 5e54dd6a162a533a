//! Interview-experience submissions and their moderation.

mod repository;
mod service;
mod types;

pub use repository::SubmissionRepository;
pub use service::{
    validate_year, ModerationError, ModerationService, SubmissionDraft, MAX_NAME_LENGTH, MIN_YEAR,
};
pub use types::{
    fold_name, Caller, NewSubmission, ParseStatusError, Round, RoundResult, Submission, SubmissionFilter,
    SubmissionStatus,
};

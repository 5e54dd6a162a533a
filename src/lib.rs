//! Prepboard - moderated interview-experience board
//!
//! Members sign up and reset passwords with emailed one-time codes, log in for
//! a five-hour session token, and submit interview experiences that become
//! public only after an administrator approves them.

pub mod assistant;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod submission;
pub mod web;

pub use assistant::{Assistant, AssistantError, GeminiClient, TextGenerator};
pub use auth::{
    hash_password, login, validate_password, verify_password, LoginOutcome, PasswordError,
    SessionClaims, SessionError, SessionKeys, VerificationError, VerificationService,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{PrepboardError, Result};
pub use notify::{LogNotifier, NotificationSink, NotifyError};
pub use submission::{
    Caller, ModerationError, ModerationService, Submission, SubmissionDraft, SubmissionStatus,
};
pub use web::WebServer;

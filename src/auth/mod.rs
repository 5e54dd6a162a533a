//! Authentication module for prepboard.
//!
//! This module provides password hashing, the email verification flows
//! (signup and password reset by one-time code) and session issuance.

mod password;
mod session;
mod verification;

pub use password::{
    hash_password, hash_password_blocking, validate_password, verify_password,
    verify_dummy_blocking, verify_password_blocking, PasswordError, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use session::{
    login, LoginOutcome, SessionClaims, SessionError, SessionKeys, DEFAULT_SESSION_DURATION_SECS,
};
pub use verification::{
    generate_code, normalize_email, VerificationError, VerificationService, CODE_MAX, CODE_MIN,
};

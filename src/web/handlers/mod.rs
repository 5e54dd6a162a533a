//! API handlers.

pub mod auth;
pub mod submission;

pub use auth::*;
pub use submission::*;

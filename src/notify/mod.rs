//! Outbound notifications.
//!
//! The verification flows hand every issued code to a [`NotificationSink`].
//! Delivery is best effort: callers log a failed send and carry on.

mod smtp;

pub use smtp::SmtpNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::db::CodePurpose;
use crate::logging::mask_email;

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Sender or recipient address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be built.
    #[error("failed to build message: {0}")]
    Build(String),

    /// Transport setup or delivery failed.
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Destination for one-time codes.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a one-time code to an email address.
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), NotifyError>;
}

/// Sink that only records that a code was issued.
///
/// Used when no SMTP relay is configured. The code itself is never logged.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send_code(
        &self,
        email: &str,
        _code: &str,
        purpose: CodePurpose,
    ) -> Result<(), NotifyError> {
        info!(
            recipient = %mask_email(email),
            %purpose,
            "mail relay not configured; code not delivered"
        );
        Ok(())
    }
}

/// Build the sink described by the mail configuration.
///
/// An empty SMTP host selects [`LogNotifier`].
pub fn from_config(
    config: &MailConfig,
    code_ttl_minutes: i64,
) -> Result<Arc<dyn NotificationSink>, NotifyError> {
    if config.smtp_host.trim().is_empty() {
        warn!("SMTP host not configured; one-time codes will only be logged");
        return Ok(Arc::new(LogNotifier));
    }
    Ok(Arc::new(SmtpNotifier::new(config, code_ttl_minutes)?))
}

/// Subject line and plain-text body for a code email.
pub(crate) fn render_code_message(
    code: &str,
    purpose: CodePurpose,
    ttl_minutes: i64,
) -> (&'static str, String) {
    match purpose {
        CodePurpose::Signup => (
            "Your Prepboard signup code",
            format!(
                "Welcome to Prepboard!\n\nYour verification code is {code}.\n\
                 It expires in {ttl_minutes} minutes.\n\n\
                 If you did not request this, please ignore this email."
            ),
        ),
        CodePurpose::Reset => (
            "Your Prepboard password reset code",
            format!(
                "We received a password reset request for your account.\n\n\
                 Your reset code is {code}.\nIt expires in {ttl_minutes} minutes.\n\n\
                 If you did not request this, please ignore this email."
            ),
        ),
    }
}

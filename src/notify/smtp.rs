//! SMTP delivery via lettre.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

use super::{render_code_message, NotificationSink, NotifyError};
use crate::config::MailConfig;
use crate::db::CodePurpose;
use crate::logging::mask_email;

/// Sends one-time codes through an SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    code_ttl_minutes: i64,
}

impl SmtpNotifier {
    /// Build the notifier from mail configuration.
    pub fn new(config: &MailConfig, code_ttl_minutes: i64) -> Result<Self, NotifyError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("sender: {e}")))?;

        let builder = if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| NotifyError::Transport(e.to_string()))?
        .port(config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&config.smtp_username, &config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
            code_ttl_minutes,
        })
    }
}

#[async_trait]
impl NotificationSink for SmtpNotifier {
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), NotifyError> {
        let to = email
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("recipient: {e}")))?;
        let (subject, body) = render_code_message(code, purpose, self.code_ttl_minutes);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(recipient = %mask_email(email), %purpose, "code email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_username: Some("mailer".to_string()),
            smtp_password: Some("secret".to_string()),
            ..MailConfig::default()
        }
    }

    #[tokio::test]
    async fn test_new_with_credentials() {
        assert!(SmtpNotifier::new(&mail_config(), 10).is_ok());
    }

    #[tokio::test]
    async fn test_new_with_implicit_tls() {
        let config = MailConfig {
            use_starttls: false,
            ..mail_config()
        };
        assert!(SmtpNotifier::new(&config, 10).is_ok());
    }

    #[tokio::test]
    async fn test_send_rejects_bad_recipient() {
        let notifier = SmtpNotifier::new(&mail_config(), 10).unwrap();
        let result = notifier
            .send_code("not an address", "123456", CodePurpose::Signup)
            .await;
        assert!(matches!(result, Err(NotifyError::InvalidAddress(_))));
    }
}

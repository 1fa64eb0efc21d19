//! SMTP notifier
//!
//! Sends the key through an authenticated relay over implicit TLS (SMTPS).
//! Credentials come from `MailConfig`; without them nothing is sent and the
//! failure is a configuration error.

use crate::config::MailConfig;
use crate::constants::mail::KEY_SUBJECT;
use crate::error::{Error, Result};
use crate::notify::{key_message_body, Notifier};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Notifier that mails keys through an SMTP relay
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Build the delivery message for `recipient`
    fn build_message(&self, recipient: &str, key: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .sender
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|e| Error::Notify(format!("Invalid recipient address {}: {}", recipient, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(KEY_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(key_message_body(key))
            .map_err(|e| Error::Notify(format!("Failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(
            self.config.sender.trim().to_string(),
            self.config.password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| Error::Notify(format!("Invalid SMTP relay: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(credentials)
                .build(),
        )
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send_key(&self, recipient: &str, key: &str) -> Result<()> {
        if !self.config.has_credentials() {
            return Err(Error::Config(
                "Email credentials (EMAIL_ADDRESS, EMAIL_PASSWORD) are not set".to_string(),
            ));
        }

        let message = self.build_message(recipient, key)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| Error::Notify(format!("SMTP delivery failed: {}", e)))?;

        info!(recipient, relay = %self.config.smtp_host, "Sent API key email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> MailConfig {
        MailConfig {
            sender: "keys@example.com".to_string(),
            password: "app-password".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let notifier = SmtpNotifier::new(MailConfig::default());
        let err = notifier.send_key("a@example.com", "00af").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_password_is_config_error() {
        let config = MailConfig {
            password: String::new(),
            ..configured()
        };
        let err = SmtpNotifier::new(config)
            .send_key("a@example.com", "00af")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_message_headers_and_body() {
        let notifier = SmtpNotifier::new(configured());
        let message = notifier.build_message("a@example.com", "00af").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Your New Quantum-Powered API Key"));
        assert!(raw.contains("To: a@example.com"));
        assert!(raw.contains("From: keys@example.com"));
        assert!(raw.contains("Your new secure API Key is: 00af"));
    }

    #[test]
    fn test_invalid_recipient_is_notify_error() {
        let notifier = SmtpNotifier::new(configured());
        let err = notifier.build_message("not an address", "00af").unwrap_err();
        assert!(matches!(err, Error::Notify(_)));
    }
}

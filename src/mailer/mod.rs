use anyhow::Result;
use lettre::{
    message::{header::ContentType, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use tracing::warn;

use crate::config::SmtpConfig;

/// Outbound email sender. Delivery is best-effort only: ticket operations
/// must succeed whether or not the notification goes out.
#[derive(Clone)]
pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message> {
        let message = Message::builder()
            .from(self
                .config
                .from
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid from address: {e}"))?)
            .to(to_email
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow::anyhow!("Failed to build email: {e}"))?;

        Ok(message)
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let mailer = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                let creds = Credentials::new(user.clone(), pass.clone());
                SmtpTransport::relay(&self.config.host)
                    .map_err(|e| anyhow::anyhow!("SMTP relay error: {e}"))?
                    .credentials(creds)
                    .build()
            }
            _ => SmtpTransport::builder_dangerous(&self.config.host)
                .port(self.config.port)
                .build(),
        };
        Ok(mailer)
    }

    pub fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(to_email, subject, body)?;
        self.transport()?
            .send(&message)
            .map_err(|e| anyhow::anyhow!("Failed to send email: {e}"))?;
        Ok(())
    }

    /// Fire-and-forget dispatch from async handlers. The SMTP round-trip runs
    /// on the blocking pool; failures are logged and swallowed.
    pub fn send_detached(&self, to_email: &str, subject: &str, body: &str) {
        let mailer = self.clone();
        let to = to_email.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.send(&to, &subject, &body) {
                warn!("Failed to send notification email to {to}: {e:#}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            from: "Smart Campus <noreply@smartcampus.test>".to_string(),
        }
    }

    #[test]
    fn test_build_message() {
        let mailer = Mailer::new(test_config());
        let message = mailer.build_message(
            "newton@student.test",
            "Ticket received",
            "Hello Newton, your ticket was created and is OPEN.",
        );
        assert!(message.is_ok());
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mailer = Mailer::new(test_config());
        assert!(mailer
            .build_message("not an address", "Ticket received", "body")
            .is_err());
    }

    #[test]
    fn test_plain_transport_without_credentials() {
        let mailer = Mailer::new(test_config());
        assert!(mailer.transport().is_ok());
    }
}

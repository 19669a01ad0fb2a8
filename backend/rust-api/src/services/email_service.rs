use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpSettings;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, recipient_email: &str, verify_url: &str)
        -> Result<()>;
}

pub fn sending_disabled() -> bool {
    std::env::var("EMAIL_SEND_DISABLED")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn verification_body(verify_url: &str) -> String {
    format!(
        "Welcome to the AP Chem Study Hub!\n\nConfirm your email address to finish creating your account:\n{}\n\nIf you did not sign up, you can ignore this message.\n",
        verify_url
    )
}

pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );

        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
            .context("Invalid SMTP server for STARTTLS")?
            .port(self.settings.port)
            .credentials(creds);

        Ok(builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_email(
        &self,
        recipient_email: &str,
        verify_url: &str,
    ) -> Result<()> {
        let from_address: Mailbox = format!(
            "{} <{}>",
            self.settings.from_name, self.settings.from_email
        )
        .parse()
        .context("Invalid from email address")?;
        let to_address: Mailbox = recipient_email
            .parse()
            .context("Invalid recipient email address")?;

        let email = Message::builder()
            .from(from_address)
            .to(to_address)
            .subject("Verify your AP Chem Study Hub account")
            .body(verification_body(verify_url))
            .context("Failed to build verification email")?;

        self.build_transport()?
            .send(email)
            .await
            .context("Failed to send verification email")?;

        tracing::info!("Verification email sent to {}", recipient_email);
        Ok(())
    }
}

/// Used when SMTP is not configured or sending is disabled: the link goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_email(
        &self,
        recipient_email: &str,
        verify_url: &str,
    ) -> Result<()> {
        tracing::info!(
            "Email sending disabled; verification link for {}: {}",
            recipient_email,
            verify_url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_contains_link() {
        let body = verification_body("https://hub.example/verify?token=abc");
        assert!(body.contains("https://hub.example/verify?token=abc"));
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        LogMailer
            .send_verification_email("a@b.co", "http://localhost/verify")
            .await
            .unwrap();
    }
}

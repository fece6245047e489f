//! Outgoing mail for contact replies. The SMTP transport is built once at
//! startup; without `SMTP_HOST` no mailer exists and replies are refused.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(mail.to.parse()?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        info!(to = %mail.to, "email sent");
        Ok(())
    }
}

/// Keeps every message in memory instead of sending it.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let _: lettre::Address = mail.to.parse()?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_mailer_validates_recipient() {
        let mailer = RecordingMailer::default();
        let ok = OutgoingMail {
            to: "visitor@example.com".into(),
            subject: "Re: hello".into(),
            body: "thanks".into(),
        };
        mailer.send(ok.clone()).await.unwrap();

        let bad = OutgoingMail {
            to: "not-an-email".into(),
            ..ok.clone()
        };
        let err = mailer.send(bad).await.unwrap_err();
        assert!(err.to_string().contains("invalid email address"));
        assert_eq!(mailer.sent(), vec![ok]);
    }

    #[tokio::test]
    async fn smtp_mailer_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 2525,
            username: Some("user".into()),
            password: Some("pass".into()),
            from: "site@example.com".into(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}

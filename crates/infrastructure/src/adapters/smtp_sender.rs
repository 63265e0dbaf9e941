//! SMTP email sender on lettre's async transport

use std::time::Duration;

use application::{
    error::ApplicationError,
    ports::{EmailSenderPort, OutgoingEmail},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;
use tracing::{debug, instrument, warn};

use crate::config::SmtpConfig;

/// Error type for SMTP delivery
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for ApplicationError {
    fn from(e: EmailError) -> Self {
        match e {
            EmailError::Transport(e) if e.is_permanent() => {
                Self::Internal(format!("SMTP rejected message: {e}"))
            },
            EmailError::Transport(e) => Self::ExternalService(format!("SMTP error: {e}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Sends HTML email through an SMTP relay
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailSender")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpEmailSender {
    /// Build the pooled transport; no connection is made until the first send
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let from = Mailbox::new(config.from_name.clone(), config.from.parse()?);

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            warn!(host = %config.host, "SMTP without TLS; use only for local relays");
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port)
        .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.from.clone())
            .to(email.to.as_str().parse()?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSenderPort for SmtpEmailSender {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ApplicationError> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(EmailError::from)?;
        debug!("Email handed to SMTP relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::EmailAddress;

    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            from: "forecast@example.com".into(),
            from_name: Some("Weather".into()),
            ..SmtpConfig::default()
        }
    }

    #[tokio::test]
    async fn message_carries_html_body_and_sender() {
        let sender = SmtpEmailSender::new(&config()).unwrap();
        let email = OutgoingEmail::new(
            EmailAddress::new("a@x.com").unwrap(),
            "Weather forecast for Kyiv",
            "<p>Sunny</p>",
        )
        .unwrap();

        let raw = String::from_utf8(sender.build_message(&email).unwrap().formatted()).unwrap();

        assert!(raw.contains("<forecast@example.com>"));
        assert!(raw.contains("To: a@x.com"));
        assert!(raw.contains("Subject: Weather forecast for Kyiv"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[tokio::test]
    async fn invalid_from_address_is_rejected() {
        let config = SmtpConfig {
            from: "not-an-email".into(),
            ..config()
        };
        assert!(matches!(
            SmtpEmailSender::new(&config),
            Err(EmailError::Address(_))
        ));
    }

    #[test]
    fn build_error_maps_to_internal() {
        let err: ApplicationError = EmailError::Build("missing body".into()).into();
        assert!(matches!(err, ApplicationError::Internal(_)));
    }
}

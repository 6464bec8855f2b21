use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{OutboundMessage, Transport, TransportError};
use crate::config::MailerConfig;

/// Network-backed transport: STARTTLS relay with username/password auth.
pub struct SmtpMailer {
    host: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Returns `Ok(None)` when the config lacks host, username or password.
    pub fn from_config(config: &MailerConfig) -> Result<Option<Self>, TransportError> {
        let (Some(host), Some(username), Some(password)) = (
            config.host(),
            config.username(),
            config.password(),
        ) else {
            return Ok(None);
        };

        let creds = Credentials::new(username.to_string(), password.to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| TransportError::Smtp(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Some(SmtpMailer {
            host: host.to_string(),
            transport,
        }))
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Turn an [`OutboundMessage`] into a multipart/alternative lettre message.
pub fn build_message(message: &OutboundMessage) -> Result<Message, TransportError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e: AddressError| TransportError::InvalidAddress {
            field: "from",
            reason: e.to_string(),
        })?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e: AddressError| TransportError::InvalidAddress {
            field: "to",
            reason: e.to_string(),
        })?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ))
        .map_err(|e| TransportError::Build(e.to_string()))
}

#[rocket::async_trait]
impl Transport for SmtpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        let email = build_message(message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;
        let text = response.message().collect::<Vec<_>>().join(" ");
        Ok(format!("{} {}", response.code(), text))
    }
}

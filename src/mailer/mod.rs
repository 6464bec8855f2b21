pub mod simulated;
pub mod smtp;

use std::sync::Arc;

use thiserror::Error;

use crate::config::MailerConfig;

/// A fully composed email, ready to hand to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl OutboundMessage {
    /// Compose the confirmation-code email for `display_name`.
    pub fn confirmation(from: &str, to: &str, display_name: &str, code: &str) -> Self {
        let subject = format!("Your confirmation code: {}", code);

        let text_body = format!(
            "Hi {},\n\n\
             Your confirmation code is: {}\n\n\
             If you did not request this code, you can ignore this email.\n",
            display_name, code,
        );

        let html_body = format!(
            "<p>Hi {},</p>\
             <p>Your confirmation code is: <strong style=\"font-size:1.4em;letter-spacing:2px\">{}</strong></p>\
             <p style=\"color:#666\">If you did not request this code, you can ignore this email.</p>",
            html_escape(display_name),
            html_escape(code),
        );

        OutboundMessage {
            to: to.to_string(),
            from: from.to_string(),
            subject,
            text_body,
            html_body,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid {field} address: {reason}")]
    InvalidAddress { field: &'static str, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send error: {0}")]
    Smtp(String),
}

/// Outbound mail capability. Anything that can report "sent" or "failed".
#[rocket::async_trait]
pub trait Transport: Send + Sync {
    /// Send one message. On success returns a short description of what the
    /// server said, for logging.
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError>;

    /// True for the log-only transport used when no SMTP server is configured.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Pick the transport once at startup: real SMTP when the config is complete,
/// otherwise the log-only simulation.
pub fn from_config(config: &MailerConfig) -> Result<Arc<dyn Transport>, TransportError> {
    match smtp::SmtpMailer::from_config(config)? {
        Some(mailer) => {
            log::info!(
                "[mailer] SMTP transport enabled ({}:{})",
                mailer.host(),
                config.port
            );
            Ok(Arc::new(mailer))
        }
        None => {
            log::warn!(
                "[mailer] SMTP host/username/password not configured, running in simulation mode"
            );
            Ok(Arc::new(simulated::SimulatedMailer::new()))
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

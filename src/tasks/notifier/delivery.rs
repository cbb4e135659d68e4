use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, error};
use thiserror::Error;

use crate::config::SmtpSettings;

/// A plain-text email for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build email: {0}")]
    Message(String),
    #[error("failed to send email: {0}")]
    Transport(String),
}

pub trait Mailer: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&settings.from)?;

        // 465 is implicit TLS, anything else upgrades with STARTTLS
        let relay = if settings.port == 465 {
            SmtpTransport::relay(&settings.host)
        } else {
            SmtpTransport::starttls_relay(&settings.host)
        };
        let builder = relay
            .map_err(|e| DeliveryError::Transport(format!("SMTP relay {}: {}", settings.host, e)))?
            .port(settings.port);

        let builder = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        debug!("SMTP transport ready for {}:{}", settings.host, settings.port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&notification.to)?)
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        self.transport.send(&email).map(|_| ()).map_err(|e| {
            error!("Failed to send email: {}", e);
            DeliveryError::Transport(e.to_string())
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse::<Mailbox>().map_err(|e| DeliveryError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(from: &str) -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            from: from.to_string(),
        }
    }

    #[test]
    fn test_rejects_invalid_sender() {
        let result = SmtpMailer::new(&settings("not an address"));
        assert!(matches!(result, Err(DeliveryError::Address { .. })));
    }

    #[test]
    fn test_accepts_named_sender() {
        assert!(SmtpMailer::new(&settings("ExpoLIS <expolis@example.org>")).is_ok());
    }
}

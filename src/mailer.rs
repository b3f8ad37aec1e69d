//! Registration confirmation email.
//!
//! Sending is fire-and-forget: the registration ledger spawns the call after
//! the registration is stored and only logs failures.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::MailConfig;
use crate::models::{Event, Registration};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(
        &self,
        registration: &Registration,
        event: &Event,
    ) -> Result<(), MailError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn confirmation_subject(event: &Event) -> String {
    format!("Registration confirmed: {}", event.name)
}

fn confirmation_body(registration: &Registration, event: &Event) -> String {
    format!(
        "Hello {name},\n\n\
         You are registered for {event} on {date} at {time}, {venue}.\n\n\
         Registration ID: {id}\n\
         Ticket: {tier} ({price})\n\n\
         Show this code at the entrance to check in:\n{token}\n\n\
         QR data: {qr}\n",
        name = registration.name,
        event = event.name,
        date = event.date,
        time = event.time,
        venue = event.venue,
        id = registration.registration_id,
        tier = registration.ticket_tier,
        price = registration.ticket_price,
        token = registration.scan_token(),
        qr = registration.qr_payload,
    )
}

/// Sends through an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = parse_mailbox(&format!("{} <{}>", config.from_name, config.from_email))?;

        tracing::info!(
            "Mail: SMTP relay {}:{} as {}",
            config.smtp_host,
            config.smtp_port,
            config.from_email
        );
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation(
        &self,
        registration: &Registration,
        event: &Event,
    ) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&registration.email)?)
            .subject(confirmation_subject(event))
            .header(ContentType::TEXT_PLAIN)
            .body(confirmation_body(registration, event))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Used when no SMTP relay is configured; logs what would have been sent.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(
        &self,
        registration: &Registration,
        event: &Event,
    ) -> Result<(), MailError> {
        tracing::info!(
            registration_id = %registration.registration_id,
            to = %registration.email,
            subject = %confirmation_subject(event),
            "Mail: SMTP not configured, confirmation logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mailbox() {
        let mailbox = parse_mailbox("Event Desk <desk@example.com>").unwrap();
        assert_eq!(mailbox.email.to_string(), "desk@example.com");
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(MailError::Address { .. })
        ));
    }
}

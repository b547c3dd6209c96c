//! Mail transports for winner certificates.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use tracing::info;

use super::repository::{MailError, Mailer, OutboundEmail};
use crate::config::{MailConfig, MailTransport};

/// Logs messages instead of delivering them. Used in development and demos.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        info!(
            to = %email.to_email,
            name = %email.to_name,
            subject = %email.subject,
            "mail delivery disabled, logging message"
        );
        info!(body = %email.text_body, "plain text body");
        Ok(())
    }
}

/// SMTP delivery through lettre. The transport carries the configured timeout, so a
/// stalled server surfaces as a transport error for that one message.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| MailError::Transport("no SMTP host configured".to_string()))?;

        let mut builder = SmtpTransport::relay(host)
            .map_err(|err| MailError::Transport(format!("SMTP relay error: {err}")))?
            .port(config.smtp_port)
            .timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: mailbox(&config.from_name, &config.from_email)?,
        })
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(&email.to_name, &email.to_email)?)
            .subject(email.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|err| MailError::Build(err.to_string()))?;

        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|err| MailError::Transport(err.to_string()))
    }
}

fn mailbox(name: &str, email: &str) -> Result<Mailbox, MailError> {
    let address = email
        .trim()
        .parse::<Address>()
        .map_err(|err| MailError::InvalidAddress {
            address: email.to_string(),
            reason: err.to_string(),
        })?;
    let name = Some(name.trim().to_string()).filter(|name| !name.is_empty());
    Ok(Mailbox::new(name, address))
}

/// Transport chosen from configuration at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredMailer {
    Console(ConsoleMailer),
    Smtp(SmtpMailer),
}

impl ConfiguredMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        match config.transport {
            MailTransport::Console => Ok(Self::Console(ConsoleMailer)),
            MailTransport::Smtp => SmtpMailer::from_config(config).map(Self::Smtp),
        }
    }
}

impl Mailer for ConfiguredMailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        match self {
            Self::Console(mailer) => mailer.send(email),
            Self::Smtp(mailer) => mailer.send(email),
        }
    }
}

//! Mailer capability and its SMTP implementation over lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use super::message::OutgoingEmail;
use crate::config::SmtpConfig;
use crate::error::MailerError;

/// An authenticated message-sending connection.
///
/// Acquired once per campaign and used strictly sequentially.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Check connectivity and credentials before any send.
    async fn verify_connection(&self) -> Result<(), MailerError>;

    /// Send one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// SMTP mailer (STARTTLS relay with credentials).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailerError::Connection(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            host: config.host.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify_connection(&self) -> Result<(), MailerError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                tracing::info!(host = %self.host, "SMTP connection verified");
                Ok(())
            }
            Ok(false) => Err(MailerError::Authentication(format!(
                "{} did not accept the session",
                self.host
            ))),
            Err(e) => Err(MailerError::Authentication(e.to_string())),
        }
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let message = build_message(email)?;
        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                MailerError::Rejected(e.to_string())
            } else {
                MailerError::Connection(e.to_string())
            }
        })?;

        tracing::debug!(to = %email.to, "Email sent");
        Ok(())
    }
}

/// Build the MIME message: plain-text body plus the optional attachment.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, MailerError> {
    let parse_mailbox = |address: &str| {
        address
            .parse::<Mailbox>()
            .map_err(|e| MailerError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })
    };

    let builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone());

    let result = match &email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(attachment.content_type())
                .map_err(|e| MailerError::Build(format!("Invalid content type: {e}")))?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body_text.clone()))
                    .singlepart(
                        Attachment::new(attachment.filename().to_string())
                            .body(attachment.bytes().to_vec(), content_type),
                    ),
            )
        }
        None => builder.body(email.body_text.clone()),
    };

    result.map_err(|e| MailerError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::message::{AttachmentPayload, EmailTemplate};

    fn template() -> EmailTemplate {
        EmailTemplate {
            from_address: "me@example.com".into(),
            subject: "Application".into(),
            body_text: "Please find my resume attached.".into(),
        }
    }

    #[test]
    fn builds_multipart_with_attachment() {
        let attachment = AttachmentPayload::new(b"resume".to_vec(), "resume.txt", "text/plain");
        let email = OutgoingEmail::compose("hr@acme.io", &template(), Some(&attachment));
        let message = build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("resume.txt"));
        assert!(raw.contains("Subject: Application"));
    }

    #[test]
    fn builds_plain_message_without_attachment() {
        let email = OutgoingEmail::compose("hr@acme.io", &template(), None);
        let raw = String::from_utf8(build_message(&email).unwrap().formatted()).unwrap();
        assert!(!raw.contains("multipart"));
        assert!(raw.contains("Please find my resume attached."));
    }

    #[test]
    fn rejects_unparseable_recipient() {
        let email = OutgoingEmail::compose("not an address", &template(), None);
        assert!(matches!(
            build_message(&email),
            Err(MailerError::InvalidAddress { .. })
        ));
    }
}

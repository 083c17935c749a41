use crate::error::NotificationError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

/// Delivers a fired alert to a human. Implementations are shared between
/// concurrently running checks.
pub trait NotificationSink: Send + Sync {
    fn send_alert(&self, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// Writes alerts to the operational log instead of sending mail.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogSink {
    fn send_alert(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        tracing::warn!(subject = %subject, body = %body, "alert raised");
        Ok(())
    }
}

/// Outbound relay settings for [`EmailSink`].
#[derive(Clone)]
pub struct SmtpRelay {
    pub server: String,
    pub port: u16,
    pub account: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpRelay")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Sends alerts as plain-text mail over an implicit-TLS SMTP session.
pub struct EmailSink {
    from: Mailbox,
    recipients: Vec<Mailbox>,
    transport: SmtpTransport,
}

impl EmailSink {
    pub fn new(relay: &SmtpRelay, recipients: &[String]) -> Result<Self, NotificationError> {
        let from = parse_mailbox(&relay.account)?;
        let recipients = recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>, _>>()?;

        let transport = SmtpTransport::relay(&relay.server)
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .port(relay.port)
            .credentials(Credentials::new(
                relay.account.clone(),
                relay.password.clone(),
            ))
            .timeout(Some(relay.timeout))
            .build();

        Ok(Self {
            from,
            recipients,
            transport,
        })
    }

    /// `From`, `To` (every recipient, comma separated) and `Subject`
    /// headers followed by the plain-text body.
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| NotificationError::Message(e.to_string()))
    }
}

impl NotificationSink for EmailSink {
    fn send_alert(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let message = self.build_message(subject, body)?;
        tracing::info!(
            subject = %subject,
            recipients = self.recipients.len(),
            "sending alert email"
        );

        self.transport
            .send(&message)
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        tracing::info!(subject = %subject, "alert email sent");
        Ok(())
    }
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotificationError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn relay() -> SmtpRelay {
        SmtpRelay {
            server: "smtp.example.org".to_string(),
            port: 465,
            account: "monitor@example.org".to_string(),
            password: "hunter2".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    #[traced_test]
    fn test_log_sink_records_subject_and_body() {
        let sink = LogSink::new();
        sink.send_alert(
            "ALERT: BUFR_out files are not updating!",
            "Expected the directory to be re-populated every hour.",
        )
        .unwrap();

        assert!(logs_contain("ALERT: BUFR_out files are not updating!"));
        assert!(logs_contain(
            "Expected the directory to be re-populated every hour."
        ));
    }

    #[test]
    fn test_message_headers() {
        let sink = EmailSink::new(
            &relay(),
            &["a@example.org".to_string(), "b@example.org".to_string()],
        )
        .unwrap();
        let message = sink
            .build_message("ALERT: glacio01 down!", "glacio01 is no longer updating.")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: monitor@example.org\r\n"));
        assert!(raw.contains("To: a@example.org, b@example.org\r\n"));
        assert!(raw.contains("Subject: ALERT: glacio01 down!\r\n"));
        assert!(raw.contains("\r\n\r\nglacio01 is no longer updating."));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let result = EmailSink::new(&relay(), &["not an address".to_string()]);
        assert!(matches!(result, Err(NotificationError::Address { .. })));
    }

    #[test]
    fn test_relay_debug_hides_password() {
        assert!(!format!("{:?}", relay()).contains("hunter2"));
    }
}

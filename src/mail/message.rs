//! Outgoing message built for a single send

use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;

use super::error::TransportError;

/// A message snapshot taken when `send` is called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub html_body: Vec<u8>,
}

impl MailMessage {
    pub fn new(to: &[String], from: &str, subject: &str, html_body: &str) -> Self {
        Self {
            to: to.to_vec(),
            from: from.to_string(),
            subject: subject.to_string(),
            html_body: html_body.as_bytes().to_vec(),
        }
    }

    /// Builds the MIME message with an HTML body.
    ///
    /// # Errors
    /// Returns an error if the sender or any receiver is not a valid mailbox
    /// (`user@domain` or `Name <user@domain>`), or if the message has no
    /// receiver.
    pub fn to_message(&self) -> Result<Message, TransportError> {
        let mut builder = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_HTML);

        for receiver in &self.to {
            builder = builder.to(receiver.parse::<Mailbox>()?);
        }

        Ok(builder.body(self.html_body.clone())?)
    }
}

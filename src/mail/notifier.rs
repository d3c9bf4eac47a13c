//! Email notifier.
//!
//! Holds the sender, SMTP host, authentication strategy, receivers and TLS
//! flag, and sends subject/HTML-body messages to all receivers over a single
//! SMTP connection per call.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::address::split_host_port;
use super::auth::{AuthStrategy, PlainAuth};
use super::login_auth::LoginAuth;
use super::message::MailMessage;
use super::transport::{Session, SmtpTransport, Transport};
use crate::error::{NotifyError, NotifyResult};

/// Email notifier
///
/// # Example
/// ```ignore
/// let mut notifier = Notifier::new("alerts@example.com", "smtp.example.com:465");
/// notifier
///     .set_login_auth("alerts@example.com", "password123")
///     .add_receivers(["ops@example.com"])
///     .enable_tls();
///
/// notifier.send(&CancellationToken::new(), "Disk almost full", "<b>93%</b> used")?;
/// ```
#[derive(Clone)]
pub struct Notifier {
    sender_address: String,
    smtp_host_address: String,
    auth: Option<AuthStrategy>,
    receivers: Vec<String>,
    tls_enabled: bool,
    transport: Arc<dyn Transport>,
}

impl Notifier {
    /// Creates a notifier with no receivers, no authentication and TLS disabled
    ///
    /// # Arguments
    /// * `sender_address` - Mailbox put in `From`, e.g. "Alerts <alerts@example.com>"
    /// * `smtp_host_address` - SMTP server as "host:port"
    pub fn new(sender_address: impl Into<String>, smtp_host_address: impl Into<String>) -> Self {
        Self {
            sender_address: sender_address.into(),
            smtp_host_address: smtp_host_address.into(),
            auth: None,
            receivers: Vec::new(),
            tls_enabled: false,
            transport: Arc::new(SmtpTransport::default()),
        }
    }

    /// Replaces the transport used to deliver messages
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Authenticates with `AUTH PLAIN`, replacing any previous strategy
    ///
    /// Example values: "", "test@gmail.com", "password123", "smtp.gmail.com".
    /// `host` must equal the hostname part of the SMTP host address.
    pub fn set_plain_auth(
        &mut self,
        identity: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> &mut Self {
        self.auth = Some(AuthStrategy::Plain(PlainAuth::new(
            identity, username, password, host,
        )));
        self
    }

    /// Authenticates with `AUTH LOGIN`, replacing any previous strategy
    pub fn set_login_auth(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.auth = Some(AuthStrategy::Login(LoginAuth::new(username, password)));
        self
    }

    /// Appends receivers; order is kept and duplicates are allowed
    pub fn add_receivers<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Connects with TLS from the first byte instead of opportunistic STARTTLS
    pub fn enable_tls(&mut self) -> &mut Self {
        self.tls_enabled = true;
        self
    }

    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }

    pub fn smtp_host_address(&self) -> &str {
        &self.smtp_host_address
    }

    pub fn auth(&self) -> Option<&AuthStrategy> {
        self.auth.as_ref()
    }

    pub fn receivers(&self) -> &[String] {
        &self.receivers
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    /// Sends a message to every receiver.
    ///
    /// The message body is HTML. The call blocks until the server has accepted
    /// or rejected the message. `ctx` is checked once before any network I/O;
    /// it does not interrupt a delivery in progress.
    ///
    /// # Errors
    /// - [`NotifyError::Cancelled`] if `ctx` is already cancelled
    /// - [`NotifyError::NoReceivers`] if no receiver was added
    /// - [`NotifyError::HostParse`] if TLS is enabled and the host has no port
    /// - [`NotifyError::Send`] for any connection, TLS, authentication or
    ///   protocol failure
    pub fn send(&self, ctx: &CancellationToken, subject: &str, message: &str) -> NotifyResult<()> {
        if ctx.is_cancelled() {
            debug!(host = %self.smtp_host_address, "Mail send cancelled before connecting");
            return Err(NotifyError::Cancelled);
        }

        if self.receivers.is_empty() {
            return Err(NotifyError::NoReceivers);
        }

        let mail = MailMessage::new(&self.receivers, &self.sender_address, subject, message);
        let session = self.session()?;

        debug!(
            host = %self.smtp_host_address,
            tls = self.tls_enabled,
            receivers = self.receivers.len(),
            auth = self.auth.as_ref().map(AuthStrategy::mechanism),
            "Sending mail"
        );

        self.transport
            .deliver(&session, self.auth.as_ref(), &mail)
            .map_err(|source| NotifyError::Send { source })?;

        info!(
            host = %self.smtp_host_address,
            receivers = self.receivers.len(),
            "Mail sent"
        );
        Ok(())
    }

    fn session(&self) -> NotifyResult<Session> {
        if !self.tls_enabled {
            return Ok(Session::opportunistic(&self.smtp_host_address));
        }

        let (server_name, _) = split_host_port(&self.smtp_host_address)?;
        Ok(Session::implicit_tls(&self.smtp_host_address, server_name))
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sender_address", &self.sender_address)
            .field("smtp_host_address", &self.smtp_host_address)
            .field("auth", &self.auth)
            .field("receivers", &self.receivers)
            .field("tls_enabled", &self.tls_enabled)
            .finish_non_exhaustive()
    }
}

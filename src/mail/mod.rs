//! SMTP email notifier.
//!
//! [`Notifier`] is the entry point: configure sender, host, receivers,
//! authentication and TLS, then call [`Notifier::send`]. Delivery goes
//! through a [`Transport`], which is [`SmtpTransport`] unless replaced.

mod address;
mod auth;
mod login_auth;
mod message;
mod notifier;

pub mod error;
pub mod transport;

pub use address::split_host_port;
pub use auth::{AuthStart, AuthStrategy, PlainAuth, ServerInfo};
pub use error::{AuthError, HostParseError, TransportError};
pub use login_auth::LoginAuth;
pub use message::MailMessage;
pub use notifier::Notifier;
pub use transport::{Security, Session, SmtpTransport, Transport};

#[cfg(test)]
pub(crate) use notifier::tests::RecordingTransport;

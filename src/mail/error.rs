//! Error types for the mail service

use thiserror::Error;

/// A host address that could not be split into hostname and port
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("address {address}: {reason}")]
pub struct HostParseError {
    /// The address as it was configured
    pub address: String,
    /// What was wrong with it
    pub reason: &'static str,
}

impl HostParseError {
    pub(crate) fn new(address: &str, reason: &'static str) -> Self {
        Self {
            address: address.to_string(),
            reason,
        }
    }
}

/// Errors raised by an authentication strategy during the SASL exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The server sent a prompt the strategy does not know how to answer
    #[error("unexpected server challenge, {challenge}")]
    UnexpectedChallenge { challenge: String },

    /// PLAIN credentials would travel over a non-TLS connection to a remote host
    #[error("unencrypted connection")]
    UnencryptedConnection,

    /// The connected server is not the host the PLAIN credentials were issued for
    #[error("wrong host name")]
    WrongHostName,
}

/// Errors raised while talking to the SMTP server
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Endpoint(#[from] HostParseError),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("smtp: server doesn't support AUTH")]
    AuthNotSupported,

    #[error("smtp: too many authentication challenges")]
    TooManyChallenges,
}

impl TransportError {
    /// Returns the authentication error behind this failure, if any
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            TransportError::Auth(e) => Some(e),
            _ => None,
        }
    }
}

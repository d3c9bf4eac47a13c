use crate::mail::error::{HostParseError, TransportError};
use thiserror::Error;

/// Crate-wide error type returned by notifiers.
///
/// Every failure of a send surfaces as exactly one of these variants; nothing
/// is retried and nothing is partially delivered.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The caller's cancellation token was already triggered when `send` started
    #[error("operation cancelled")]
    Cancelled,

    /// TLS was requested but the SMTP host address has no usable port
    #[error(transparent)]
    HostParse(#[from] HostParseError),

    /// No receiver has been added to the notifier
    #[error("no receivers configured")]
    NoReceivers,

    /// Any transport, protocol, TLS or authentication failure during delivery
    #[error("failed to send mail: {source}")]
    Send {
        #[source]
        source: TransportError,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl NotifyError {
    /// Returns true if the send was aborted by the cancellation token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NotifyError::Cancelled)
    }
}

impl From<TransportError> for NotifyError {
    fn from(source: TransportError) -> Self {
        NotifyError::Send { source }
    }
}

impl From<anyhow::Error> for NotifyError {
    fn from(error: anyhow::Error) -> Self {
        NotifyError::Internal { source: error }
    }
}

/// Type alias for Result with NotifyError to simplify function signatures
pub type NotifyResult<T> = Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::AuthError;
    use std::error::Error as _;

    #[test]
    fn test_send_error_display_and_source() {
        let err: NotifyError = TransportError::from(AuthError::WrongHostName).into();

        assert_eq!(err.to_string(), "failed to send mail: wrong host name");
        assert!(err.source().is_some());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_host_parse_is_transparent() {
        let err = NotifyError::from(HostParseError::new("smtp.example.com", "missing port in address"));
        assert_eq!(
            err.to_string(),
            "address smtp.example.com: missing port in address"
        );
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err = NotifyError::from(anyhow::anyhow!("join failed"));
        assert!(matches!(err, NotifyError::Internal { .. }));
        assert_eq!(err.source().map(|s| s.to_string()), Some("join failed".to_string()));
    }

    #[test]
    fn test_cancelled() {
        assert!(NotifyError::Cancelled.is_cancelled());
        assert_eq!(NotifyError::Cancelled.to_string(), "operation cancelled");
    }
}

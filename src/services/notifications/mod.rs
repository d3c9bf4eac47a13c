//! Notification system with pluggable providers.
//!
//! The core trait `NotificationProvider` lets host applications treat every
//! channel the same way. `EmailProvider` is the SMTP implementation.

mod email_provider;
mod provider;

pub use email_provider::EmailProvider;
pub use provider::NotificationProvider;

//! Fusion-Notify Library
//!
//! SMTP email notifier with pluggable authentication, plus the configuration,
//! logging and command-line layers around it.

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod mail;
pub mod services;

pub use error::{NotifyError, NotifyResult};
pub use mail::Notifier;

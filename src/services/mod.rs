//! Service layer used by host applications.

pub mod notifications;

pub use notifications::{EmailProvider, NotificationProvider};

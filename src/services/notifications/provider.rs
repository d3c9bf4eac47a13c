//! Notification provider abstraction.
//!
//! Host applications drive notifiers through [`NotificationProvider`] so
//! that channels can be swapped without touching call sites.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::NotifyResult;

/// Trait for notification providers
///
/// Uses `async_trait` to support async methods with dynamic dispatch.
/// All providers must be Send + Sync for use in async contexts.
///
/// # Example Implementation
/// ```ignore
/// use async_trait::async_trait;
///
/// pub struct ConsoleProvider;
///
/// #[async_trait]
/// impl NotificationProvider for ConsoleProvider {
///     async fn send(&self, ctx: &CancellationToken, subject: &str, message: &str) -> NotifyResult<()> {
///         println!("{subject}: {message}");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "console"
///     }
/// }
/// ```
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Sends a notification
    ///
    /// # Arguments
    /// * `ctx` - Cancellation token checked before any I/O
    /// * `subject` - Notification title
    /// * `message` - Notification body
    async fn send(&self, ctx: &CancellationToken, subject: &str, message: &str)
    -> NotifyResult<()>;

    /// Returns the provider name for logging/debugging
    ///
    /// # Returns
    /// Static string identifying the provider (e.g., "email")
    fn name(&self) -> &'static str;
}

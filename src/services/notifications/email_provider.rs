//! Email notification provider.
//!
//! Adapts the blocking [`Notifier`] to [`NotificationProvider`] by running
//! each send on tokio's blocking thread pool.

use super::provider::NotificationProvider;
use crate::error::NotifyResult;
use crate::mail::Notifier;
use anyhow::anyhow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Email notification provider
///
/// # Example
/// ```ignore
/// let notifier = settings.mail.build_notifier();
/// let provider = EmailProvider::new(notifier);
/// provider.send(&CancellationToken::new(), "Backup finished", "<p>ok</p>").await?;
/// ```
#[derive(Debug, Clone)]
pub struct EmailProvider {
    notifier: Notifier,
}

impl EmailProvider {
    /// Creates a new email provider
    ///
    /// # Arguments
    /// * `notifier` - Fully configured notifier (receivers, auth, TLS)
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[async_trait]
impl NotificationProvider for EmailProvider {
    async fn send(
        &self,
        ctx: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> NotifyResult<()> {
        let notifier = self.notifier.clone();
        let ctx = ctx.clone();
        let subject = subject.to_string();
        let message = message.to_string();

        debug!(provider = self.name(), "Dispatching notification");

        tokio::task::spawn_blocking(move || notifier.send(&ctx, &subject, &message))
            .await
            .map_err(|e| anyhow!("email send task failed: {}", e))?
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

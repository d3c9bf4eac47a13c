//! Command executor for dispatching CLI commands

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::parser::{Cli, Commands};
use crate::config::{ConfigLoader, Settings};
use crate::logger::init_logger;
use crate::services::{EmailProvider, NotificationProvider};

/// Loads settings as selected by the global CLI options
///
/// # Errors
/// Returns configuration loading or validation failures
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut loader = ConfigLoader::new()?;
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(env) = cli.env {
        loader = loader.with_environment(env.into());
    }

    let mut settings = loader.load()?;
    if let Some(level) = cli.log_level_override() {
        settings.logger.level = level.to_string();
    }
    Ok(settings)
}

/// Runs the parsed command
///
/// # Errors
/// Returns configuration, logger or delivery failures
pub async fn execute_command(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;

    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Invalid logger configuration")?;
    init_logger(logger_config)?;

    match cli.command {
        Commands::Check => {
            info!(
                host = %settings.mail.host,
                receivers = settings.mail.receivers.len(),
                tls = settings.mail.tls,
                "Configuration is valid"
            );
            Ok(())
        }
        Commands::Send { subject, message } => {
            let provider = EmailProvider::new(settings.mail.build_notifier());
            let ctx = CancellationToken::new();

            let cancel = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling send");
                    cancel.cancel();
                }
            });

            provider
                .send(&ctx, &subject, &message)
                .await
                .with_context(|| format!("{} notification failed", provider.name()))
        }
    }
}

//! Configuration validation logic
//!
//! Each section validates itself and reports the first offending field.

use validator::ValidateEmail;

use crate::config::error::ConfigError;
use crate::config::settings::{AuthMethod, FileSettings, LoggerSettings, MailSettings, Settings};
use crate::mail::split_host_port;

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Returns the `user@domain` part of `user@domain` or `Name <user@domain>`
fn addr_spec(mailbox: &str) -> &str {
    let mailbox = mailbox.trim();
    match (mailbox.rfind('<'), mailbox.strip_suffix('>')) {
        (Some(start), Some(inner)) => &inner[start + 1..],
        _ => mailbox,
    }
}

fn is_valid_mailbox(mailbox: &str) -> bool {
    addr_spec(mailbox).validate_email()
}

impl MailSettings {
    /// Validate mail configuration
    ///
    /// # Validation Rules
    /// - Sender and every receiver must be a valid mailbox
    /// - At least one receiver must be configured
    /// - Host must be "host:port"
    /// - Timeout must be greater than 0
    /// - `plain` and `login` need a username and a password
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_mailbox(&self.sender) {
            return Err(ConfigError::validation(
                "mail.sender",
                format!("Invalid sender address '{}'.", self.sender),
            ));
        }

        if self.receivers.is_empty() {
            return Err(ConfigError::validation(
                "mail.receivers",
                "At least one receiver is required.",
            ));
        }

        if let Some(receiver) = self.receivers.iter().find(|r| !is_valid_mailbox(r)) {
            return Err(ConfigError::validation(
                "mail.receivers",
                format!("Invalid receiver address '{}'.", receiver),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::validation(
                "mail.host",
                "SMTP host is required, e.g. \"smtp.example.com:587\".",
            ));
        }

        if let Err(e) = split_host_port(&self.host) {
            return Err(ConfigError::validation("mail.host", e.to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "mail.timeout_secs",
                "Timeout must be greater than 0 seconds.",
            ));
        }

        if self.hello_name.trim().is_empty() {
            return Err(ConfigError::validation(
                "mail.hello_name",
                "EHLO name must not be empty.",
            ));
        }

        if self.auth.method != AuthMethod::None {
            if self.auth.username.is_empty() {
                return Err(ConfigError::validation(
                    "mail.auth.username",
                    "Username is required when authentication is enabled.",
                ));
            }
            if self.auth.password.is_empty() {
                return Err(ConfigError::validation(
                    "mail.auth.password",
                    "Password is required when authentication is enabled.",
                ));
            }
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - At least one of console and file output must be enabled
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mail.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}

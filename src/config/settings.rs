//! Configuration settings structures
//!
//! Every section has defaults so a configuration made only of `FUSION_*`
//! environment variables still deserializes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};
use crate::mail::{Notifier, SmtpTransport, split_host_port};

// ============================================================================
// Default value functions
// ============================================================================

fn default_timeout_secs() -> u64 {
    30
}

fn default_hello_name() -> String {
    "localhost".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/notify.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Mail
// ============================================================================

/// SMTP authentication method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Send without authenticating
    #[default]
    None,
    /// `AUTH PLAIN`
    Plain,
    /// `AUTH LOGIN`
    Login,
}

/// SMTP authentication settings
///
/// `identity` and `host` are only used by `plain`. When `host` is omitted the
/// hostname part of `mail.host` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub method: AuthMethod,

    #[serde(default)]
    pub identity: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub host: Option<String>,
}

/// Mail delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    /// Mailbox put in `From`
    #[serde(default)]
    pub sender: String,

    /// SMTP server as "host:port"
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub receivers: Vec<String>,

    /// Implicit TLS from the first byte (usually port 465)
    #[serde(default)]
    pub tls: bool,

    #[serde(default)]
    pub auth: AuthSettings,

    /// Connect and I/O timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Domain announced with EHLO
    #[serde(default = "default_hello_name")]
    pub hello_name: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sender: String::new(),
            host: String::new(),
            receivers: Vec::new(),
            tls: false,
            auth: AuthSettings::default(),
            timeout_secs: default_timeout_secs(),
            hello_name: default_hello_name(),
        }
    }
}

impl MailSettings {
    /// Builds a notifier from these settings
    ///
    /// # Returns
    /// A notifier with receivers, authentication and TLS applied, delivering
    /// through an [`SmtpTransport`] with the configured EHLO name and timeout
    pub fn build_notifier(&self) -> Notifier {
        let transport = SmtpTransport::new(
            self.hello_name.clone(),
            Some(Duration::from_secs(self.timeout_secs)),
        );

        let mut notifier =
            Notifier::new(self.sender.clone(), self.host.clone()).with_transport(Arc::new(transport));
        notifier.add_receivers(self.receivers.iter().cloned());

        match self.auth.method {
            AuthMethod::None => {}
            AuthMethod::Plain => {
                notifier.set_plain_auth(
                    self.auth.identity.clone(),
                    self.auth.username.clone(),
                    self.auth.password.clone(),
                    self.plain_auth_host(),
                );
            }
            AuthMethod::Login => {
                notifier.set_login_auth(self.auth.username.clone(), self.auth.password.clone());
            }
        }

        if self.tls {
            notifier.enable_tls();
        }

        notifier
    }

    /// Host PLAIN credentials are bound to
    pub fn plain_auth_host(&self) -> String {
        match &self.auth.host {
            Some(host) => host.clone(),
            None => split_host_port(&self.host)
                .map(|(hostname, _)| hostname)
                .unwrap_or_else(|_| self.host.clone()),
        }
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert into the runtime [`LoggerConfig`] accepted by `init_logger`
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger", e.to_string()))
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format)
            .map_err(|e| ConfigError::validation("logger.file", e.to_string()))
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mail: MailSettings,

    #[serde(default)]
    pub logger: LoggerSettings,
}

//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Environment as AppEnvironment;

/// Send HTML email notifications over SMTP
#[derive(Parser, Debug)]
#[command(name = "fusion-notify", version)]
#[command(about = "Send HTML email notifications over SMTP")]
#[command(long_about = "
Sends one HTML email to every configured receiver, using the sender, SMTP
host, authentication and TLS settings from the configuration.

EXAMPLES:
    # Send with the layered configuration in ./config
    fusion-notify send --subject \"Backup finished\" --message \"<b>ok</b>\"

    # Use a single configuration file
    fusion-notify --config /etc/fusion-notify.toml send -s \"Disk\" -m \"93% used\"

    # Validate the configuration without sending
    fusion-notify check
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Loads only this TOML file instead of the layered `config/` directory.
    /// `FUSION_*` environment variables still apply on top.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override environment detection
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Send a notification to all configured receivers
    Send {
        /// Mail subject
        #[arg(short, long)]
        subject: String,

        /// HTML body
        #[arg(short, long)]
        message: String,
    },
    /// Validate the configuration and exit
    Check,
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<Environment> for AppEnvironment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => AppEnvironment::Development,
            Environment::Test => AppEnvironment::Test,
            Environment::Staging => AppEnvironment::Staging,
            Environment::Production => AppEnvironment::Production,
        }
    }
}

impl Cli {
    /// Log level forced by `--verbose` or `--quiet`
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

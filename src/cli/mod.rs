//! Command-line interface
//!
//! - Argument parsing with clap
//! - Configuration loading with CLI overrides
//! - Command execution

pub mod executor;
pub mod parser;

pub use executor::{execute_command, load_settings};
pub use parser::{Cli, Commands, Environment};

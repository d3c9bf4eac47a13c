use clap::Parser;
use fusion_notify::cli::{Cli, execute_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    execute_command(Cli::parse()).await
}

//! CLI module for Mailpilot
//!
//! Provides commands:
//! - `chat`: console session against the demo mailbox
//! - `config`: print the effective configuration with keys masked

use crate::app::AppConfig;
use clap::{Parser, Subcommand};

pub mod chat;

/// Mailpilot CLI
#[derive(Parser, Debug)]
#[command(name = "mailpilot")]
#[command(about = "Approval-gated mail and calendar assistant")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the assistant in the terminal
    Chat {
        /// Override the configured provider (e.g. "mock" to run offline)
        #[arg(long)]
        provider: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Chat { provider }) => {
            if let Some(provider) = provider {
                config.llm.provider = provider;
            }
            chat::run(config).await
        }
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config.masked())?);
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

pub mod cli;
pub mod lambda;

#[cfg(feature = "cli")]
use crate::app::handlers::HandlerKind;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "knowledge-manager")]
#[command(about = "Run knowledge manager handlers locally and inspect the stack")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one handler over an event file
    Invoke {
        #[arg(value_enum)]
        handler: HandlerKind,

        /// Trigger event (SNS, EventBridge, API body or a bare object)
        #[arg(long)]
        event: PathBuf,

        /// Offline tables, parameters and environment; AWS is used without it
        #[arg(long)]
        fixtures: Option<PathBuf>,

        #[arg(long, help = "Enable verbose output")]
        verbose: bool,
    },
    /// Print the declared tables, functions, topics and subscriptions
    Topology {
        #[arg(long)]
        pretty: bool,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn verbose(&self) -> bool {
        matches!(self.command, Command::Invoke { verbose: true, .. })
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lanyard: mirror a Discord user's live presence.
#[derive(Parser, Debug)]
#[command(name = "lanyard", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error) or a filter
    /// directive such as `lanyard_presence=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Discord user id; overrides `presence.user_id`.
    #[arg(short, long, global = true)]
    pub user_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream live presence until Ctrl-C.
    Watch {
        /// Print raw JSON instead of summary lines.
        #[arg(long)]
        json: bool,
    },
    /// Fetch the current presence once over REST.
    Fetch {
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as JSON.
    Config,
}

pub fn parse() -> Args {
    Args::parse()
}

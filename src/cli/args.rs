//! CLI argument definitions using clap
//!
//! Commands:
//! - roaster init --config <path>
//! - roaster serve --config <path>
//! - roaster reminders --config <path> [--now <rfc3339>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Roaster - team matchmaking: availability, match requests and chat
#[derive(Parser, Debug)]
#[command(name = "roaster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a fresh configuration file with a generated signing secret
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./roaster.json")]
        config: PathBuf,
    },

    /// Start the HTTP API server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./roaster.json")]
        config: PathBuf,
    },

    /// Send reminders for accepted matches in the next 24 hours
    Reminders {
        /// Path to configuration file
        #[arg(long, default_value = "./roaster.json")]
        config: PathBuf,

        /// Reference time (RFC 3339) instead of the current time
        #[arg(long)]
        now: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

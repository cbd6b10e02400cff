//! # Command Line Interface
//!
//! `init` writes a config, `serve` runs the HTTP API and `reminders`
//! performs one reminder pass.

pub mod args;
pub mod commands;
pub mod config;
pub mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command};
pub use config::AppConfig;
pub use errors::{CliError, CliErrorCode, CliResult};

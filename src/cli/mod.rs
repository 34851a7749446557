//! CLI module for Blikk.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Blikk - Voice Assistant with Vision
///
/// A worker that joins real-time rooms and runs a voice assistant able to
/// describe what it sees in the shared video feed.
/// The name "Blikk" comes from the Norwegian word for "glance."
#[derive(Parser, Debug)]
#[command(name = "blikk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the agent worker
    Start {
        /// Join a single named room instead of polling for active rooms
        #[arg(short, long)]
        room: Option<String>,
    },

    /// Check API credentials and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

//! Command-line interface for narrator
//!
//! Provides argument parsing using clap derive macros.

use crate::config::EngineKind;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Narrate document analyses as a spoken podcast
#[derive(Parser, Debug)]
#[command(
    name = "narrator",
    version,
    about = "Narrate document analyses as a spoken podcast"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: lifecycle, -vv: scheduler diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Narration engine override (command, print)
    #[arg(long, global = true, value_name = "ENGINE", value_parser = parse_engine)]
    pub engine: Option<EngineKind>,

    /// Grace period past a section's length before it is skipped. Examples: 2s, 1500ms
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub grace: Option<Duration>,
}

fn parse_engine(s: &str) -> Result<EngineKind, String> {
    s.parse().map_err(|e: crate::error::NarratorError| e.to_string())
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`. Bare numbers are
/// milliseconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and print the narration script for an analysis payload
    Script {
        /// Analysis payload (JSON)
        file: PathBuf,

        /// Print the script as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Narrate an analysis payload
    ///
    /// While playing, type a command and press enter:
    /// p (pause / play), n (next section), r (reset), q (quit).
    Play {
        /// Analysis payload (JSON)
        file: PathBuf,
    },

    /// View and initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

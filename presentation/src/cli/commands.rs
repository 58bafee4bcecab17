//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for kindergarten
#[derive(Parser, Debug)]
#[command(name = "kindergarten")]
#[command(author, version, about = "Peer-voted timeout bot for Discord communities")]
#[command(long_about = r#"
Kindergarten lets community members vote to confine a misbehaving member to a
single channel for a while. This binary runs the reconciliation daemon that
releases expired confinements, keeps channel permissions in place and drops
zones whose channel or role was deleted.

Configuration files are loaded from (in priority order):
1. KINDERGARTEN_* environment variables (DISCORD_TOKEN for the token)
2. --config <path>          Explicit config file
3. ./kindergarten.toml      Project-level config
4. ~/.config/kindergarten/config.toml   Global config

Example:
  DISCORD_TOKEN=... kindergarten run -v
  kindergarten status
  kindergarten show-config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Override the state file location
    #[arg(long, value_name = "PATH", global = true)]
    pub state_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Restore state and run the reconciliation loops until Ctrl-C
    Run,

    /// Print zones, attendees and target cooldowns from the state file
    Status {
        /// Print the raw state document instead
        #[arg(long)]
        json: bool,
    },

    /// Show configuration file locations and the effective configuration
    ShowConfig,
}

//! Configuration file loading for kindergarten
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `KINDERGARTEN_*` environment variables, then `DISCORD_TOKEN`
//! 2. `--config <path>` specified file
//! 3. Project root: `./kindergarten.toml` or `./.kindergarten.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/kindergarten/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, DEFAULT_API_BASE, FileConfig, FileCooldownConfig, FileDiscordConfig,
    FileLoggingConfig, FileReconcileConfig, FileStorageConfig, FileVotingConfig, Severity,
};
pub use loader::{ConfigLoader, ConfigSource};

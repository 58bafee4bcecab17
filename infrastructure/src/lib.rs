//! Infrastructure layer for kindergarten
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading, the JSON state
//! file and the Discord REST gateway.

pub mod config;
pub mod discord;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigLoader, ConfigSource, FileConfig, FileDiscordConfig, FileLoggingConfig,
    FileStorageConfig, Severity,
};
pub use discord::{DiscordError, DiscordGateway};
pub use storage::JsonStateStore;

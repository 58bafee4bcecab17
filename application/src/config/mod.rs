//! Application-level configuration.
//!
//! - [`BotConfig`]: voting windows, cooldowns, reconciliation intervals

pub mod bot_config;

pub use bot_config::{BotConfig, DEFAULT_DURATION_CHOICES};

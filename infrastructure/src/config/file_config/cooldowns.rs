//! Cooldown configuration from TOML (`[cooldowns]` section)

use serde::{Deserialize, Serialize};

/// Raw cooldown configuration from TOML.
///
/// The channel and initiator cooldowns default to the voting window plus one
/// and five minutes respectively, so they follow `voting.window_secs` unless
/// set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCooldownConfig {
    pub channel_secs: Option<u64>,
    pub initiator_secs: Option<u64>,
    /// Target protection after a vote that did not pass
    pub target_failure_secs: u64,
    /// Extra target protection after a confinement ends
    pub success_buffer_secs: u64,
}

impl Default for FileCooldownConfig {
    fn default() -> Self {
        Self {
            channel_secs: None,
            initiator_secs: None,
            target_failure_secs: 10 * 60,
            success_buffer_secs: 20 * 60,
        }
    }
}

impl FileCooldownConfig {
    pub fn channel_secs(&self, window_secs: u64) -> u64 {
        self.channel_secs.unwrap_or(window_secs + 60)
    }

    pub fn initiator_secs(&self, window_secs: u64) -> u64 {
        self.initiator_secs.unwrap_or(window_secs + 5 * 60)
    }
}

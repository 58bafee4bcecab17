//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; missing keys fall back to the defaults that
//! [`BotConfig`] documents.

mod cooldowns;
mod discord;
mod logging;
mod reconcile;
mod storage;
mod voting;

pub use cooldowns::FileCooldownConfig;
pub use discord::{DEFAULT_API_BASE, FileDiscordConfig};
pub use logging::FileLoggingConfig;
pub use reconcile::FileReconcileConfig;
pub use storage::FileStorageConfig;
pub use voting::FileVotingConfig;

use kindergarten_application::BotConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub voting: FileVotingConfig,
    pub cooldowns: FileCooldownConfig,
    pub reconcile: FileReconcileConfig,
    pub storage: FileStorageConfig,
    pub discord: FileDiscordConfig,
    pub logging: FileLoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The value is replaced by its default
    Warning,
    /// The bot refuses to start
    Error,
}

/// A single problem found while validating the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field,
            message: message.into(),
        }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.voting.window_secs == 0 {
            issues.push(ConfigIssue::error(
                "voting.window_secs",
                "voting window must be at least one second",
            ));
        }
        if self.voting.early_finish_grace_secs >= self.voting.window_secs {
            issues.push(ConfigIssue::warning(
                "voting.early_finish_grace_secs",
                "grace is not shorter than the voting window, votes will never finish early",
            ));
        }
        if self.voting.duration_choices.contains(&0) {
            issues.push(ConfigIssue::error(
                "voting.duration_choices",
                "durations must be positive",
            ));
        }
        if self.voting.role_name.trim().is_empty() {
            issues.push(ConfigIssue::warning(
                "voting.role_name",
                "empty role name, using \"Kindergarten Attendee\"",
            ));
        }

        for (field, value) in [
            ("reconcile.expiry_secs", self.reconcile.expiry_secs),
            ("reconcile.permission_sync_secs", self.reconcile.permission_sync_secs),
            ("reconcile.prune_secs", self.reconcile.prune_secs),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(field, "interval must be at least one second"));
            }
        }

        if self.discord.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            issues.push(ConfigIssue::error("discord.token", "token is empty"));
        }

        issues
    }

    /// True if any issue prevents the bot from starting
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Convert to the application-layer [`BotConfig`]
    pub fn to_bot_config(&self) -> BotConfig {
        let window = self.voting.window_secs;
        let role_name = if self.voting.role_name.trim().is_empty() {
            FileVotingConfig::default().role_name
        } else {
            self.voting.role_name.clone()
        };

        BotConfig {
            voting_window: Duration::from_secs(window),
            early_finish_grace: Duration::from_secs(self.voting.early_finish_grace_secs),
            channel_cooldown: Duration::from_secs(self.cooldowns.channel_secs(window)),
            initiator_cooldown: Duration::from_secs(self.cooldowns.initiator_secs(window)),
            target_failure_cooldown: Duration::from_secs(self.cooldowns.target_failure_secs),
            success_buffer: Duration::from_secs(self.cooldowns.success_buffer_secs),
            expiry_interval: Duration::from_secs(self.reconcile.expiry_secs),
            permission_sync_interval: Duration::from_secs(self.reconcile.permission_sync_secs),
            prune_interval: Duration::from_secs(self.reconcile.prune_secs),
            duration_choices: self.voting.duration_choices.clone(),
            exempt_users: self.discord.exempt_users.clone(),
            role_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindergarten_domain::UserId;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[voting]
window_secs = 600
early_finish_grace_secs = 30
duration_choices = [5, 15]
role_name = "Timeout"

[cooldowns]
target_failure_secs = 120

[reconcile]
expiry_secs = 10

[storage]
state_file = "/var/lib/kindergarten/state.json"

[discord]
exempt_users = ["42"]

[logging]
directory = "/var/log/kindergarten"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.voting.window_secs, 600);
        assert_eq!(config.voting.role_name, "Timeout");
        assert_eq!(config.cooldowns.target_failure_secs, 120);
        assert_eq!(config.reconcile.expiry_secs, 10);
        assert_eq!(config.reconcile.prune_secs, 300);
        assert!(config.logging.directory.is_some());
        assert!(config.validate().is_empty());

        let bot = config.to_bot_config();
        assert_eq!(bot.voting_window, Duration::from_secs(600));
        assert_eq!(bot.channel_cooldown, Duration::from_secs(660));
        assert_eq!(bot.initiator_cooldown, Duration::from_secs(900));
        assert_eq!(bot.target_failure_cooldown, Duration::from_secs(120));
        assert_eq!(bot.duration_choices, vec![5, 15]);
        assert_eq!(bot.exempt_users, vec![UserId::new(42)]);
    }

    #[test]
    fn test_default_matches_bot_config() {
        let from_file = FileConfig::default().to_bot_config();
        let defaults = BotConfig::default();
        assert_eq!(from_file.voting_window, defaults.voting_window);
        assert_eq!(from_file.early_finish_grace, defaults.early_finish_grace);
        assert_eq!(from_file.channel_cooldown, defaults.channel_cooldown);
        assert_eq!(from_file.initiator_cooldown, defaults.initiator_cooldown);
        assert_eq!(from_file.success_buffer, defaults.success_buffer);
        assert_eq!(from_file.expiry_interval, defaults.expiry_interval);
        assert_eq!(
            from_file.permission_sync_interval,
            defaults.permission_sync_interval
        );
        assert_eq!(from_file.prune_interval, defaults.prune_interval);
        assert_eq!(from_file.duration_choices, defaults.duration_choices);
        assert_eq!(from_file.role_name, defaults.role_name);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let mut config = FileConfig::default();
        config.voting.window_secs = 0;
        config.voting.duration_choices = vec![0, 10];
        config.reconcile.prune_secs = 0;
        config.voting.role_name = " ".to_string();

        let issues = config.validate();
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert!(fields.contains(&"voting.window_secs"));
        assert!(fields.contains(&"voting.early_finish_grace_secs"));
        assert!(fields.contains(&"voting.duration_choices"));
        assert!(fields.contains(&"reconcile.prune_secs"));
        assert!(fields.contains(&"voting.role_name"));
        assert!(FileConfig::has_errors(&issues));

        assert_eq!(config.to_bot_config().role_name, "Kindergarten Attendee");
    }

    #[test]
    fn test_grace_warning_is_not_fatal() {
        let mut config = FileConfig::default();
        config.voting.early_finish_grace_secs = config.voting.window_secs;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!FileConfig::has_errors(&issues));
    }
}

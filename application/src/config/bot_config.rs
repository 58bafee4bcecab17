//! Bot behaviour parameters.
//!
//! [`BotConfig`] groups the timings and policy knobs the use cases need:
//! voting windows, cooldown lengths, reconciliation intervals and the
//! confinement durations members may choose from. These are application-layer
//! concerns; the raw TOML shape lives in the infrastructure layer.

use chrono::TimeDelta;
use kindergarten_domain::{CooldownPolicy, DomainError, UserId};
use std::time::Duration;

/// Durations (in minutes) offered to members when nominating someone
pub const DEFAULT_DURATION_CHOICES: [u32; 10] = [10, 30, 60, 120, 180, 240, 300, 360, 480, 720];

/// Runtime parameters for voting, cooldowns and reconciliation.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | voting window | 7 min |
/// | early-finish grace | 1 min |
/// | channel cooldown | window + 1 min |
/// | initiator cooldown | window + 5 min |
/// | target cooldown after a failed vote | 10 min |
/// | buffer after a successful vote | 20 min |
/// | expiry / permission / prune loops | 60 s / 600 s / 300 s |
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// How long a nomination stays open
    pub voting_window: Duration,
    /// How long the threshold must hold before a vote closes early
    pub early_finish_grace: Duration,
    pub channel_cooldown: Duration,
    pub initiator_cooldown: Duration,
    pub target_failure_cooldown: Duration,
    pub success_buffer: Duration,
    pub expiry_interval: Duration,
    pub permission_sync_interval: Duration,
    pub prune_interval: Duration,
    /// Allowed confinement lengths in minutes
    pub duration_choices: Vec<u32>,
    /// Users who can never be nominated and may use the admin override
    pub exempt_users: Vec<UserId>,
    /// Name used when looking up or creating the confinement role
    pub role_name: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        let voting_window = Duration::from_secs(7 * 60);
        Self {
            voting_window,
            early_finish_grace: Duration::from_secs(60),
            channel_cooldown: voting_window + Duration::from_secs(60),
            initiator_cooldown: voting_window + Duration::from_secs(5 * 60),
            target_failure_cooldown: Duration::from_secs(10 * 60),
            success_buffer: Duration::from_secs(20 * 60),
            expiry_interval: Duration::from_secs(60),
            permission_sync_interval: Duration::from_secs(600),
            prune_interval: Duration::from_secs(300),
            duration_choices: DEFAULT_DURATION_CHOICES.to_vec(),
            exempt_users: Vec::new(),
            role_name: "Kindergarten Attendee".to_string(),
        }
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

impl BotConfig {
    // ==================== Builder Methods ====================

    pub fn with_voting_window(mut self, window: Duration) -> Self {
        self.voting_window = window;
        self
    }

    pub fn with_early_finish_grace(mut self, grace: Duration) -> Self {
        self.early_finish_grace = grace;
        self
    }

    pub fn with_exempt_users(mut self, users: Vec<UserId>) -> Self {
        self.exempt_users = users;
        self
    }

    pub fn with_duration_choices(mut self, choices: Vec<u32>) -> Self {
        self.duration_choices = choices;
        self
    }

    // ==================== Derived Values ====================

    pub fn cooldown_policy(&self) -> CooldownPolicy {
        CooldownPolicy {
            channel: to_delta(self.channel_cooldown),
            initiator: to_delta(self.initiator_cooldown),
            target_failure: to_delta(self.target_failure_cooldown),
            success_buffer: to_delta(self.success_buffer),
        }
    }

    pub fn voting_window_delta(&self) -> TimeDelta {
        to_delta(self.voting_window)
    }

    pub fn early_finish_delta(&self) -> TimeDelta {
        to_delta(self.early_finish_grace)
    }

    pub fn is_exempt(&self, user: UserId) -> bool {
        self.exempt_users.contains(&user)
    }

    /// Validate a requested confinement length against the offered choices.
    ///
    /// An empty choice list accepts any positive duration.
    pub fn confinement_duration(&self, minutes: u32) -> Result<TimeDelta, DomainError> {
        if minutes == 0 {
            return Err(DomainError::InvalidDuration(
                "duration must be positive".to_string(),
            ));
        }
        if !self.duration_choices.is_empty() && !self.duration_choices.contains(&minutes) {
            return Err(DomainError::InvalidDuration(format!(
                "{} minutes is not one of the offered durations",
                minutes
            )));
        }
        Ok(TimeDelta::minutes(i64::from(minutes)))
    }
}

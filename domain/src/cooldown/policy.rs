//! Cooldown durations

use chrono::TimeDelta;

/// Lower bound for the success-cooldown divisor, keeps very short
/// confinements from dividing by (almost) zero.
const MIN_DIVISOR: f64 = 0.05;

/// How long each kind of cooldown lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Applied to the channel a vote was started in
    pub channel: TimeDelta,
    /// Applied to the member who started a vote
    pub initiator: TimeDelta,
    /// Applied to the target after a vote fails
    pub target_failure: TimeDelta,
    /// Added on top of the scaled confinement after a vote succeeds
    pub success_buffer: TimeDelta,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            channel: TimeDelta::minutes(8),
            initiator: TimeDelta::minutes(12),
            target_failure: TimeDelta::minutes(10),
            success_buffer: TimeDelta::minutes(20),
        }
    }
}

impl CooldownPolicy {
    /// Target cooldown after a successful vote.
    ///
    /// `confinement / max(cbrt(hours / 12) + 0.1, MIN_DIVISOR) + success_buffer`.
    /// The divisor grows with the confinement length, so the lockout grows
    /// slower than the confinement itself: 10 minutes of confinement gives
    /// roughly 50 minutes of lockout, 12 hours gives roughly 11 hours.
    pub fn target_success(&self, confinement: TimeDelta) -> TimeDelta {
        let millis = confinement.num_milliseconds().max(0) as f64;
        let hours = millis / 3_600_000.0;
        let divisor = ((hours / 12.0).cbrt() + 0.1).max(MIN_DIVISOR);
        let scaled = (millis / divisor).round() as i64;

        TimeDelta::milliseconds(scaled) + self.success_buffer
    }
}

//! Cooldown bookkeeping
//!
//! Three independent maps of "blocked until" instants. A check followed by a
//! write is not atomic across maps; the worst case is one extra vote starting
//! just before a cooldown lands, which is acceptable.

use super::policy::CooldownPolicy;
use crate::admission::RejectionReason;
use crate::core::ids::{ChannelId, UserId};
use crate::util::lock;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Mutex;

#[derive(Debug)]
pub struct CooldownLedger {
    policy: CooldownPolicy,
    channels: Mutex<HashMap<ChannelId, DateTime<Utc>>>,
    initiators: Mutex<HashMap<UserId, DateTime<Utc>>>,
    targets: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl Default for CooldownLedger {
    fn default() -> Self {
        Self::new(CooldownPolicy::default())
    }
}

fn remaining<K: Eq + Hash>(
    map: &Mutex<HashMap<K, DateTime<Utc>>>,
    key: &K,
    now: DateTime<Utc>,
) -> Option<TimeDelta> {
    lock(map)
        .get(key)
        .filter(|until| now < **until)
        .map(|until| *until - now)
}

impl CooldownLedger {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            channels: Mutex::new(HashMap::new()),
            initiators: Mutex::new(HashMap::new()),
            targets: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// First active cooldown in priority order: channel, initiator, target
    pub fn blocking_cooldown(
        &self,
        channel: ChannelId,
        initiator: UserId,
        target: UserId,
        now: DateTime<Utc>,
    ) -> Option<RejectionReason> {
        if let Some(remaining) = remaining(&self.channels, &channel, now) {
            return Some(RejectionReason::ChannelCooldown { remaining });
        }
        if let Some(remaining) = remaining(&self.initiators, &initiator, now) {
            return Some(RejectionReason::InitiatorCooldown { remaining });
        }
        remaining(&self.targets, &target, now)
            .map(|remaining| RejectionReason::TargetCooldown { remaining })
    }

    /// Called when a vote is admitted
    pub fn record_channel_and_initiator(
        &self,
        channel: ChannelId,
        initiator: UserId,
        now: DateTime<Utc>,
    ) {
        lock(&self.channels).insert(channel, now + self.policy.channel);
        lock(&self.initiators).insert(initiator, now + self.policy.initiator);
    }

    pub fn record_target_failure(&self, target: UserId, now: DateTime<Utc>) {
        lock(&self.targets).insert(target, now + self.policy.target_failure);
    }

    pub fn record_target_success(&self, target: UserId, now: DateTime<Utc>, confinement: TimeDelta) {
        lock(&self.targets).insert(target, now + self.policy.target_success(confinement));
    }

    pub fn target_cooldown_until(&self, target: UserId) -> Option<DateTime<Utc>> {
        lock(&self.targets).get(&target).copied()
    }

    /// Persistable copy of the target cooldowns
    pub fn target_cooldowns(&self) -> BTreeMap<UserId, DateTime<Utc>> {
        lock(&self.targets).iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Replace target cooldowns with persisted ones
    pub fn restore_target_cooldowns(&self, cooldowns: BTreeMap<UserId, DateTime<Utc>>) {
        *lock(&self.targets) = cooldowns.into_iter().collect();
    }

    /// Forget every cooldown that has run out. Returns how many were dropped.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        fn prune<K: Eq + Hash>(map: &Mutex<HashMap<K, DateTime<Utc>>>, now: DateTime<Utc>) -> usize {
            let mut map = lock(map);
            let before = map.len();
            map.retain(|_, until| now < *until);
            before - map.len()
        }

        prune(&self.channels, now) + prune(&self.initiators, now) + prune(&self.targets, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNEL: ChannelId = ChannelId::new(1);
    const INITIATOR: UserId = UserId::new(2);
    const TARGET: UserId = UserId::new(3);

    #[test]
    fn test_clear_ledger_blocks_nothing() {
        let ledger = CooldownLedger::default();
        assert_eq!(ledger.blocking_cooldown(CHANNEL, INITIATOR, TARGET, Utc::now()), None);
    }

    #[test]
    fn test_channel_cooldown_wins_over_others() {
        let ledger = CooldownLedger::default();
        let now = Utc::now();
        ledger.record_target_failure(TARGET, now);
        ledger.record_channel_and_initiator(CHANNEL, INITIATOR, now);

        let reason = ledger.blocking_cooldown(CHANNEL, INITIATOR, TARGET, now).unwrap();
        assert_eq!(
            reason,
            RejectionReason::ChannelCooldown { remaining: TimeDelta::minutes(8) }
        );

        // Another channel: initiator cooldown is next
        let reason = ledger
            .blocking_cooldown(ChannelId::new(9), INITIATOR, TARGET, now)
            .unwrap();
        assert!(matches!(reason, RejectionReason::InitiatorCooldown { .. }));

        // Another channel and initiator: target cooldown is last
        let reason = ledger
            .blocking_cooldown(ChannelId::new(9), UserId::new(9), TARGET, now)
            .unwrap();
        assert!(matches!(reason, RejectionReason::TargetCooldown { .. }));
    }

    #[test]
    fn test_cooldowns_expire() {
        let ledger = CooldownLedger::default();
        let now = Utc::now();
        ledger.record_channel_and_initiator(CHANNEL, INITIATOR, now);
        ledger.record_target_failure(TARGET, now);

        let later = now + TimeDelta::minutes(12);
        assert_eq!(ledger.blocking_cooldown(CHANNEL, INITIATOR, TARGET, later), None);
        assert_eq!(ledger.prune_expired(later), 3);
        assert!(ledger.target_cooldowns().is_empty());
    }

    #[test]
    fn test_success_cooldown_longer_than_failure() {
        let ledger = CooldownLedger::default();
        let now = Utc::now();
        ledger.record_target_success(TARGET, now, TimeDelta::hours(2));
        let until = ledger.target_cooldown_until(TARGET).unwrap();
        assert!(until - now > ledger.policy().target_failure);
    }

    #[test]
    fn test_target_cooldowns_round_trip() {
        let ledger = CooldownLedger::default();
        let now = Utc::now();
        ledger.record_target_failure(TARGET, now);

        let saved = ledger.target_cooldowns();
        let restored = CooldownLedger::default();
        restored.restore_target_cooldowns(saved.clone());
        assert_eq!(restored.target_cooldowns(), saved);
    }
}

//! Vote tally for a single nomination

use crate::core::ids::UserId;
use crate::util::lock;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// A voter's current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ballot {
    Against,
    Abstain,
    For,
}

impl Ballot {
    pub fn value(self) -> i64 {
        match self {
            Ballot::Against => -1,
            Ballot::Abstain => 0,
            Ballot::For => 1,
        }
    }

    /// The nominee may abstain or vote for themselves, never against
    pub fn clamp_for_target(self) -> Self {
        match self {
            Ballot::Against => Ballot::Abstain,
            other => other,
        }
    }
}

/// What a call to [`VoteTally::cast`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastResult {
    /// The voter's ballot already had this value
    Unchanged { total: i64 },
    Changed {
        previous: Ballot,
        effective: Ballot,
        total: i64,
    },
}

impl CastResult {
    pub fn total(&self) -> i64 {
        match self {
            CastResult::Unchanged { total } | CastResult::Changed { total, .. } => *total,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, CastResult::Changed { .. })
    }
}

/// Running vote total plus each voter's last ballot.
///
/// Re-voting replaces the previous ballot, so the total is always the sum of
/// every voter's latest effective vote. The total is an atomic so it can be
/// read without the ballot lock; it is only written while that lock is held,
/// which keeps the read-previous / apply-delta step of concurrent casts from
/// interleaving.
#[derive(Debug)]
pub struct VoteTally {
    target: UserId,
    total: AtomicI64,
    ballots: Mutex<HashMap<UserId, Ballot>>,
}

impl VoteTally {
    /// New tally with the target already counted as an abstaining participant
    pub fn new(target: UserId) -> Self {
        let mut ballots = HashMap::new();
        ballots.insert(target, Ballot::Abstain);

        Self {
            target,
            total: AtomicI64::new(0),
            ballots: Mutex::new(ballots),
        }
    }

    pub fn target(&self) -> UserId {
        self.target
    }

    pub fn cast(&self, voter: UserId, ballot: Ballot) -> CastResult {
        let effective = if voter == self.target {
            ballot.clamp_for_target()
        } else {
            ballot
        };

        let mut ballots = lock(&self.ballots);
        let previous = ballots.get(&voter).copied().unwrap_or(Ballot::Abstain);
        if previous == effective {
            return CastResult::Unchanged {
                total: self.total.load(Ordering::Acquire),
            };
        }

        ballots.insert(voter, effective);
        let delta = effective.value() - previous.value();
        let total = self.total.fetch_add(delta, Ordering::AcqRel) + delta;

        CastResult::Changed {
            previous,
            effective,
            total,
        }
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn reaches(&self, required: u32) -> bool {
        self.total() >= i64::from(required)
    }

    pub fn ballot_of(&self, voter: UserId) -> Option<Ballot> {
        lock(&self.ballots).get(&voter).copied()
    }

    /// Number of members with a recorded ballot, the target included
    pub fn participants(&self) -> usize {
        lock(&self.ballots).len()
    }
}

//! Voting results and the public tally view model

use chrono::{DateTime, TimeDelta, Utc};

/// Final result of a nomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotingOutcome {
    /// The threshold was met; the target is confined until `until`.
    ///
    /// `warnings` lists side effects that failed after the confinement was
    /// recorded (role grant, persistence). The vote result stands regardless.
    Confined {
        until: DateTime<Utc>,
        votes: i64,
        warnings: Vec<String>,
    },
    /// The threshold was not met
    Spared { votes: i64 },
}

impl VotingOutcome {
    pub fn is_confined(&self) -> bool {
        matches!(self, VotingOutcome::Confined { .. })
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, VotingOutcome::Confined { warnings, .. } if !warnings.is_empty())
    }

    pub fn votes(&self) -> i64 {
        match self {
            VotingOutcome::Confined { votes, .. } | VotingOutcome::Spared { votes } => *votes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyPhase {
    Open {
        /// Set while the threshold is held and the grace period is running
        early_finish_at: Option<DateTime<Utc>>,
    },
    Finished(VotingOutcome),
}

/// Everything needed to render the public tally of a nomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallySnapshot {
    pub initiator_name: String,
    pub target_name: String,
    pub votes: i64,
    pub required_votes: u32,
    pub duration: TimeDelta,
    pub deadline: DateTime<Utc>,
    pub phase: TallyPhase,
}

impl TallySnapshot {
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TallyPhase::Finished(_))
    }
}

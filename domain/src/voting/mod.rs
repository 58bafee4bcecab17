//! Nomination voting
//!
//! Each voter holds one ballot (`-1`, `0` or `+1`); the tally is the sum of
//! the latest ballots. The nominee starts as an abstaining participant and
//! can never vote against their own confinement.

pub mod outcome;
pub mod tally;

pub use outcome::{TallyPhase, TallySnapshot, VotingOutcome};
pub use tally::{Ballot, CastResult, VoteTally};

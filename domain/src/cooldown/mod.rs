//! Nomination cooldowns
//!
//! - **Channel**: one vote per channel at a time, plus a short gap
//! - **Initiator**: a member cannot start votes back to back
//! - **Target**: short after a failed vote, long after a successful one

pub mod ledger;
pub mod policy;

pub use ledger::CooldownLedger;
pub use policy::CooldownPolicy;

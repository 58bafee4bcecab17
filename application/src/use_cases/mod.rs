//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod admit_nomination;
pub mod configure_zone;
pub mod confinement;
pub mod persistence;
pub mod reconcile;
pub(crate) mod shared;
pub mod voting_session;

//! Domain layer for kindergarten
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Zones
//!
//! A zone (a "kindergarten") is a community's confinement channel plus the role
//! that locks members into it. Each zone owns its list of attendees, and a user
//! is an attendee of at most one zone at any time.
//!
//! ## Nominations
//!
//! Members nominate each other for confinement. A nomination is admitted only
//! if no [`RejectionReason`] applies, then decided by a live [`VoteTally`].
//!
//! ## Cooldowns
//!
//! The [`CooldownLedger`] throttles nominations per channel, per initiator and
//! per target. Only target cooldowns survive a restart.

pub mod admission;
pub mod cooldown;
pub mod core;
pub mod snapshot;
pub mod util;
pub mod voting;
pub mod zone;

// Re-export commonly used types
pub use admission::RejectionReason;
pub use cooldown::{CooldownLedger, CooldownPolicy};
pub use core::{
    error::DomainError,
    ids::{ChannelId, CommunityId, RoleId, UserId},
    permissions::{OverwriteTarget, PermissionOverwrite, Permissions},
};
pub use snapshot::{AttendeeRecord, StateSnapshot, ZoneRecord};
pub use voting::{Ballot, CastResult, TallyPhase, TallySnapshot, VoteTally, VotingOutcome};
pub use zone::{Attendee, Placement, RoleSnapshot, Zone, ZoneRegistry, ZoneSettings};

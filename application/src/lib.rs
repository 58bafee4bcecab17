//! Application layer for kindergarten
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod context;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::BotConfig;
pub use context::BotContext;
pub use ports::{
    clock::{Clock, SystemClock},
    platform::{ChannelInfo, ChannelKind, MemberInfo, PlatformError, PlatformGateway},
    state_store::{StateStore, StoreError},
    tally_view::{NoTallyView, TallyView},
};
pub use use_cases::admit_nomination::{
    AdmitError, AdmitNominationInput, AdmitNominationUseCase, Admission, Nomination,
};
pub use use_cases::configure_zone::{
    ConfigureZoneError, ConfigureZoneInput, ConfigureZoneUseCase, SetupReport,
};
pub use use_cases::confinement::{
    Confinement, ConfinementError, ConfinementService, ReleaseOutcome,
};
pub use use_cases::persistence::{PersistenceBridge, RestoreSummary};
pub use use_cases::reconcile::{ReconcileHandles, Reconciler};
pub use use_cases::voting_session::{VoteReceipt, VotingSession};

//! Admission of nominations
//!
//! A nomination is rejected with the *first* applicable reason in a fixed
//! priority order. Structural checks come first because they are free;
//! cooldowns need only the ledger; the hierarchy check needs role lookups on
//! the platform and runs last.
//!
//! | # | Reason |
//! |---|--------|
//! | 1 | no zone configured |
//! | 2 | vote started inside the zone channel |
//! | 3 | target already confined |
//! | 4 | target is the bot |
//! | 5 | target is the initiator |
//! | 6 | target is exempt (owner) |
//! | 7 | channel cooldown |
//! | 8 | initiator cooldown |
//! | 9 | target cooldown |
//! | 10 | role hierarchy does not allow acting on the target |

use crate::util::whole_minutes;
use chrono::TimeDelta;
use std::fmt;

/// Why a nomination was not admitted
///
/// These are expected outcomes, shown to the requester verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    NoZone,
    ConfinementChannel,
    TargetAlreadyConfined,
    TargetIsBot,
    TargetIsInitiator,
    TargetExempt,
    ChannelCooldown { remaining: TimeDelta },
    InitiatorCooldown { remaining: TimeDelta },
    TargetCooldown { remaining: TimeDelta },
    /// The bot cannot manage the zone role
    BotBelowZoneRole,
    /// The target's highest role outranks the zone role
    TargetOutranksZoneRole,
}

impl RejectionReason {
    /// Position in the fixed check order (1 = checked first)
    pub fn priority(&self) -> u8 {
        match self {
            RejectionReason::NoZone => 1,
            RejectionReason::ConfinementChannel => 2,
            RejectionReason::TargetAlreadyConfined => 3,
            RejectionReason::TargetIsBot => 4,
            RejectionReason::TargetIsInitiator => 5,
            RejectionReason::TargetExempt => 6,
            RejectionReason::ChannelCooldown { .. } => 7,
            RejectionReason::InitiatorCooldown { .. } => 8,
            RejectionReason::TargetCooldown { .. } => 9,
            RejectionReason::BotBelowZoneRole | RejectionReason::TargetOutranksZoneRole => 10,
        }
    }

    pub fn is_cooldown(&self) -> bool {
        matches!(self.priority(), 7..=9)
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoZone => {
                write!(f, "This server doesn't have a configured kindergarten channel.")
            }
            RejectionReason::ConfinementChannel => write!(f, "You cannot vote in this channel."),
            RejectionReason::TargetAlreadyConfined => {
                write!(f, "That user is already in a kindergarten.")
            }
            RejectionReason::TargetIsBot => write!(f, "I am an adult."),
            RejectionReason::TargetIsInitiator => write!(f, "You cannot nominate yourself."),
            RejectionReason::TargetExempt => write!(f, "That user cannot be sent to a kindergarten."),
            RejectionReason::ChannelCooldown { remaining } => write!(
                f,
                "You must wait {} minutes before voting again in this channel.",
                whole_minutes(*remaining)
            ),
            RejectionReason::InitiatorCooldown { remaining } => write!(
                f,
                "You must wait {} minutes before voting again.",
                whole_minutes(*remaining)
            ),
            RejectionReason::TargetCooldown { remaining } => write!(
                f,
                "You must wait {} minutes before voting again on this user.",
                whole_minutes(*remaining)
            ),
            RejectionReason::BotBelowZoneRole => write!(
                f,
                "I can not modify the kindergarten role! My highest role must be higher than it!"
            ),
            RejectionReason::TargetOutranksZoneRole => {
                write!(f, "The user is more powerful than the kindergarten role.")
            }
        }
    }
}

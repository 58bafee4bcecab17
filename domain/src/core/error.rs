//! Domain error types

use super::ids::{ChannelId, CommunityId, UserId};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Required votes must be at least 1, got {0}")]
    InvalidThreshold(u32),

    #[error("Channel {channel} is already the kindergarten of community {community}")]
    ChannelInUse {
        channel: ChannelId,
        community: CommunityId,
    },

    #[error("Community {0} has no kindergarten")]
    UnknownZone(CommunityId),

    #[error("Community {0} appears more than once")]
    DuplicateZone(CommunityId),

    #[error("User {0} is an attendee of more than one kindergarten")]
    DuplicateAttendee(UserId),

    #[error("Attendee {user} refers to community {community}, which has no kindergarten")]
    BrokenAttendeeLink { user: UserId, community: CommunityId },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DomainError::InvalidThreshold(0);
        assert_eq!(error.to_string(), "Required votes must be at least 1, got 0");

        let error = DomainError::BrokenAttendeeLink {
            user: UserId::new(1),
            community: CommunityId::new(2),
        };
        assert_eq!(
            error.to_string(),
            "Attendee 1 refers to community 2, which has no kindergarten"
        );
    }
}

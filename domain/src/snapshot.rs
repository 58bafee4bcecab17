//! Persisted state document
//!
//! The whole durable state is one document: every zone with its attendees,
//! plus the target cooldowns. Channel and initiator cooldowns are short and
//! deliberately left out. There is no schema version field.
//!
//! ```json
//! {
//!   "zones": [
//!     {
//!       "communityId": "1",
//!       "channelId": "10",
//!       "roleId": "20",
//!       "requiredVotes": 3,
//!       "attendees": [
//!         { "userId": "7", "endTime": "2024-05-01T12:00:00Z", "communityId": "1" }
//!       ]
//!     }
//!   ],
//!   "targetCooldowns": { "7": "2024-05-01T18:00:00Z" }
//! }
//! ```

use crate::core::ids::{ChannelId, CommunityId, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
    #[serde(default)]
    pub target_cooldowns: BTreeMap<UserId, DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub role_id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_role_id: Option<RoleId>,
    pub required_votes: u32,
    #[serde(default)]
    pub attendees: Vec<AttendeeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRecord {
    pub user_id: UserId,
    pub end_time: DateTime<Utc>,
    /// Owning zone; absent means the zone record this entry is stored in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<CommunityId>,
}

impl StateSnapshot {
    pub fn attendee_count(&self) -> usize {
        self.zones.iter().map(|z| z.attendees.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_documented_layout() {
        let json = r#"{
            "zones": [{
                "communityId": "1",
                "channelId": "10",
                "roleId": "20",
                "requiredVotes": 3,
                "attendees": [{ "userId": "7", "endTime": "2024-05-01T12:00:00Z" }]
            }],
            "targetCooldowns": { "7": "2024-05-01T18:00:00Z" }
        }"#;

        let snapshot: StateSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.zones.len(), 1);
        assert_eq!(snapshot.zones[0].announce_role_id, None);
        assert_eq!(snapshot.attendee_count(), 1);
        assert_eq!(snapshot.zones[0].attendees[0].community_id, None);
        assert!(snapshot.target_cooldowns.contains_key(&UserId::new(7)));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snapshot: StateSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, StateSnapshot::default());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let record = ZoneRecord {
            community_id: CommunityId::new(1),
            channel_id: ChannelId::new(2),
            role_id: RoleId::new(3),
            announce_role_id: None,
            required_votes: 1,
            attendees: vec![],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("announceRoleId"));
        assert!(json.contains("\"requiredVotes\":1"));
    }
}

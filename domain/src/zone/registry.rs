//! Zone registry
//!
//! The set of configured zones, at most one per community. The registry lock
//! guards structural changes (add, replace, remove, relocating an attendee
//! between zones); each zone's attendee list has its own lock. Lock order is
//! always registry first, attendee list second.

use super::entities::{Attendee, Zone, ZoneSettings};
use crate::core::error::DomainError;
use crate::core::ids::{ChannelId, CommunityId, UserId};
use crate::snapshot::ZoneRecord;
use crate::util::{read, write};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Result of [`ZoneRegistry::upsert`]
#[derive(Debug, Clone)]
pub struct Upserted {
    pub zone: Arc<Zone>,
    /// False when an existing zone was edited in place
    pub created: bool,
}

/// Result of [`ZoneRegistry::confine`]
#[derive(Debug, Clone)]
pub struct Placement {
    pub zone: Arc<Zone>,
    pub attendee: Attendee,
    /// Zone the user was detached from, if they were confined elsewhere
    pub detached_from: Option<Arc<Zone>>,
}

/// Thread-safe set of zones
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: RwLock<Vec<Arc<Zone>>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, community: CommunityId) -> Option<Arc<Zone>> {
        read(&self.zones)
            .iter()
            .find(|z| z.community_id() == community)
            .cloned()
    }

    pub fn find_by_channel(&self, channel: ChannelId) -> Option<Arc<Zone>> {
        read(&self.zones)
            .iter()
            .find(|z| z.channel_id() == channel)
            .cloned()
    }

    /// Snapshot of all zones, in registration order
    pub fn zones(&self) -> Vec<Arc<Zone>> {
        read(&self.zones).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.zones).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.zones).is_empty()
    }

    /// Create the community's zone, or edit its settings in place.
    ///
    /// Editing keeps the existing attendee list. Fails if another community's
    /// zone already uses the channel.
    pub fn upsert(
        &self,
        community: CommunityId,
        settings: ZoneSettings,
    ) -> Result<Upserted, DomainError> {
        let mut zones = write(&self.zones);

        if let Some(owner) = zones
            .iter()
            .find(|z| z.community_id() != community && z.channel_id() == settings.channel_id)
        {
            return Err(DomainError::ChannelInUse {
                channel: settings.channel_id,
                community: owner.community_id(),
            });
        }

        if let Some(existing) = zones.iter().find(|z| z.community_id() == community) {
            existing.apply_settings(settings);
            return Ok(Upserted {
                zone: Arc::clone(existing),
                created: false,
            });
        }

        let zone = Arc::new(Zone::new(community, settings));
        zones.push(Arc::clone(&zone));
        Ok(Upserted {
            zone,
            created: true,
        })
    }

    pub fn remove(&self, community: CommunityId) -> Option<Arc<Zone>> {
        let mut zones = write(&self.zones);
        let index = zones.iter().position(|z| z.community_id() == community)?;
        Some(zones.remove(index))
    }

    /// The zone currently confining `user`, if any
    pub fn confining_zone(&self, user: UserId) -> Option<Arc<Zone>> {
        read(&self.zones)
            .iter()
            .find(|z| z.attendees().contains(user))
            .cloned()
    }

    /// Record `user` as an attendee of the community's zone until `end_time`.
    ///
    /// A user confined in another zone is detached from it first, so exactly
    /// one zone owns the attendee afterwards. Holding the registry write lock
    /// serializes concurrent relocations of the same user.
    pub fn confine(
        &self,
        community: CommunityId,
        user: UserId,
        end_time: DateTime<Utc>,
    ) -> Result<Placement, DomainError> {
        let zones = write(&self.zones);

        let zone = zones
            .iter()
            .find(|z| z.community_id() == community)
            .cloned()
            .ok_or(DomainError::UnknownZone(community))?;

        let mut detached_from = None;
        for other in zones.iter().filter(|z| z.community_id() != community) {
            if other.attendees().remove(user).is_some() {
                detached_from = Some(Arc::clone(other));
            }
        }

        let attendee = Attendee {
            user_id: user,
            end_time,
            community_id: community,
        };
        zone.attendees().upsert(attendee.clone());

        Ok(Placement {
            zone,
            attendee,
            detached_from,
        })
    }

    /// Remove `user` from the community's zone
    pub fn release(&self, community: CommunityId, user: UserId) -> Option<Attendee> {
        self.find(community)?.attendees().remove(user)
    }

    pub fn to_records(&self) -> Vec<ZoneRecord> {
        self.zones().iter().map(|z| z.to_record()).collect()
    }

    /// Replace the whole registry with zones rebuilt from persisted records.
    ///
    /// Every attendee is re-linked to the zone named by its stored community
    /// id (falling back to the record it was stored in). Nothing is applied
    /// unless every record is valid.
    pub fn restore(&self, records: Vec<ZoneRecord>) -> Result<(), DomainError> {
        let rebuilt = Self::rebuild(records)?;
        *write(&self.zones) = rebuilt;
        Ok(())
    }

    fn rebuild(records: Vec<ZoneRecord>) -> Result<Vec<Arc<Zone>>, DomainError> {
        let mut zones: Vec<Arc<Zone>> = Vec::with_capacity(records.len());
        let mut channels = HashSet::new();

        for record in &records {
            if zones.iter().any(|z| z.community_id() == record.community_id) {
                return Err(DomainError::DuplicateZone(record.community_id));
            }
            if !channels.insert(record.channel_id) {
                let owner = zones
                    .iter()
                    .find(|z| z.channel_id() == record.channel_id)
                    .map(|z| z.community_id())
                    .unwrap_or(record.community_id);
                return Err(DomainError::ChannelInUse {
                    channel: record.channel_id,
                    community: owner,
                });
            }

            let settings = ZoneSettings::new(record.channel_id, record.role_id, record.required_votes)?
                .with_announce_role(record.announce_role_id);
            zones.push(Arc::new(Zone::new(record.community_id, settings)));
        }

        let mut seen_users = HashSet::new();
        for record in records {
            for stored in record.attendees {
                let owner_id = stored.community_id.unwrap_or(record.community_id);
                let owner = zones
                    .iter()
                    .find(|z| z.community_id() == owner_id)
                    .ok_or(DomainError::BrokenAttendeeLink {
                        user: stored.user_id,
                        community: owner_id,
                    })?;

                if !seen_users.insert(stored.user_id) {
                    return Err(DomainError::DuplicateAttendee(stored.user_id));
                }

                owner.attendees().upsert(Attendee {
                    user_id: stored.user_id,
                    end_time: stored.end_time,
                    community_id: owner_id,
                });
            }
        }

        Ok(zones)
    }
}

//! Zone and attendee entities

use crate::core::error::DomainError;
use crate::core::ids::{ChannelId, CommunityId, RoleId, UserId};
use crate::core::permissions::Permissions;
use crate::snapshot::{AttendeeRecord, ZoneRecord};
use crate::util::{lock, read, write};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, RwLock};

/// Administrator-editable configuration of a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSettings {
    pub channel_id: ChannelId,
    pub role_id: RoleId,
    pub announce_role_id: Option<RoleId>,
    /// Vote total needed to confine a nominee
    pub required_votes: u32,
}

impl ZoneSettings {
    pub fn new(
        channel_id: ChannelId,
        role_id: RoleId,
        required_votes: u32,
    ) -> Result<Self, DomainError> {
        if required_votes < 1 {
            return Err(DomainError::InvalidThreshold(required_votes));
        }

        Ok(Self {
            channel_id,
            role_id,
            announce_role_id: None,
            required_votes,
        })
    }

    pub fn with_announce_role(mut self, role: Option<RoleId>) -> Self {
        self.announce_role_id = role;
        self
    }
}

/// A user confined to a zone until `end_time`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub user_id: UserId,
    pub end_time: DateTime<Utc>,
    /// Back-reference to the owning zone
    pub community_id: CommunityId,
}

impl Attendee {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.end_time - now).max(TimeDelta::zero())
    }

    pub fn to_record(&self) -> AttendeeRecord {
        AttendeeRecord {
            user_id: self.user_id,
            end_time: self.end_time,
            community_id: Some(self.community_id),
        }
    }
}

/// Resolved view of a role on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: RoleId,
    pub name: String,
    /// Hierarchy position, higher outranks lower
    pub position: i64,
    pub permissions: Permissions,
}

/// Attendees of a single zone, unique by user id.
///
/// Guarded independently of the registry so expiry scans of one zone never
/// block votes committing into another.
#[derive(Debug, Default)]
pub struct AttendeeList {
    entries: Mutex<Vec<Attendee>>,
}

impl AttendeeList {
    /// Consistent copy for iteration without holding the lock
    pub fn snapshot(&self) -> Vec<Attendee> {
        lock(&self.entries).clone()
    }

    pub fn find(&self, user: UserId) -> Option<Attendee> {
        lock(&self.entries).iter().find(|a| a.user_id == user).cloned()
    }

    pub fn contains(&self, user: UserId) -> bool {
        lock(&self.entries).iter().any(|a| a.user_id == user)
    }

    /// Insert or replace the entry for `attendee.user_id`
    pub(crate) fn upsert(&self, attendee: Attendee) {
        let mut entries = lock(&self.entries);
        match entries.iter_mut().find(|a| a.user_id == attendee.user_id) {
            Some(existing) => *existing = attendee,
            None => entries.push(attendee),
        }
    }

    pub fn remove(&self, user: UserId) -> Option<Attendee> {
        let mut entries = lock(&self.entries);
        let index = entries.iter().position(|a| a.user_id == user)?;
        Some(entries.remove(index))
    }

    /// Attendees whose confinement has ended at `now`
    pub fn scan_for_expired(&self, now: DateTime<Utc>) -> Vec<Attendee> {
        lock(&self.entries)
            .iter()
            .filter(|a| a.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

/// A community's confinement zone (kindergarten)
///
/// The settings can be edited in place; the attendee list keeps its identity
/// across edits.
#[derive(Debug)]
pub struct Zone {
    community_id: CommunityId,
    settings: RwLock<ZoneSettings>,
    attendees: AttendeeList,
    /// Role lookups are cached for the process lifetime. A role's identity
    /// never changes, so the cache is only dropped when the zone switches to
    /// a different role.
    cached_role: Mutex<Option<RoleSnapshot>>,
}

impl Zone {
    pub fn new(community_id: CommunityId, settings: ZoneSettings) -> Self {
        Self {
            community_id,
            settings: RwLock::new(settings),
            attendees: AttendeeList::default(),
            cached_role: Mutex::new(None),
        }
    }

    pub fn community_id(&self) -> CommunityId {
        self.community_id
    }

    pub fn settings(&self) -> ZoneSettings {
        read(&self.settings).clone()
    }

    pub fn channel_id(&self) -> ChannelId {
        read(&self.settings).channel_id
    }

    pub fn role_id(&self) -> RoleId {
        read(&self.settings).role_id
    }

    pub fn required_votes(&self) -> u32 {
        read(&self.settings).required_votes
    }

    pub fn attendees(&self) -> &AttendeeList {
        &self.attendees
    }

    pub(crate) fn apply_settings(&self, settings: ZoneSettings) {
        let mut current = write(&self.settings);
        if current.role_id != settings.role_id {
            lock(&self.cached_role).take();
        }
        *current = settings;
    }

    pub fn cached_role(&self) -> Option<RoleSnapshot> {
        lock(&self.cached_role).clone()
    }

    /// Cache a resolved role; ignored if it is not this zone's current role
    pub fn cache_role(&self, role: RoleSnapshot) {
        if role.id == self.role_id() {
            *lock(&self.cached_role) = Some(role);
        }
    }

    pub fn to_record(&self) -> ZoneRecord {
        let settings = self.settings();
        ZoneRecord {
            community_id: self.community_id,
            channel_id: settings.channel_id,
            role_id: settings.role_id,
            announce_role_id: settings.announce_role_id,
            required_votes: settings.required_votes,
            attendees: self
                .attendees
                .snapshot()
                .iter()
                .map(Attendee::to_record)
                .collect(),
        }
    }
}

//! Permission bits and channel overwrite resolution
//!
//! Confinement is enforced through per-channel role overwrites rather than role
//! permission bits alone: a role can only *add* to what `@everyone` grants, so
//! "no access anywhere except one channel" has to be expressed as explicit
//! deny overwrites on every other channel plus an allow overwrite on the zone
//! channel.

use super::ids::{RoleId, UserId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A set of platform permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u64);

impl Permissions {
    pub const CREATE_INSTANT_INVITE: Self = Self(1 << 0);
    pub const KICK_MEMBERS: Self = Self(1 << 1);
    pub const BAN_MEMBERS: Self = Self(1 << 2);
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    pub const ADD_REACTIONS: Self = Self(1 << 6);
    pub const VIEW_CHANNEL: Self = Self(1 << 10);
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    pub const READ_MESSAGE_HISTORY: Self = Self(1 << 16);
    /// Also grants editing channel overwrites ("Manage Permissions")
    pub const MANAGE_ROLES: Self = Self(1 << 28);

    const NAMED: [(Self, &'static str); 12] = [
        (Self::CREATE_INSTANT_INVITE, "CreateInstantInvite"),
        (Self::KICK_MEMBERS, "KickMembers"),
        (Self::BAN_MEMBERS, "BanMembers"),
        (Self::ADMINISTRATOR, "Administrator"),
        (Self::MANAGE_CHANNELS, "ManageChannels"),
        (Self::MANAGE_GUILD, "ManageGuild"),
        (Self::ADD_REACTIONS, "AddReactions"),
        (Self::VIEW_CHANNEL, "ViewChannel"),
        (Self::SEND_MESSAGES, "SendMessages"),
        (Self::MANAGE_MESSAGES, "ManageMessages"),
        (Self::READ_MESSAGE_HISTORY, "ReadMessageHistory"),
        (Self::MANAGE_ROLES, "ManageRoles"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(u64::MAX)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Bits from `required` that are missing in `self`
    pub const fn missing(self, required: Self) -> Self {
        required.difference(self)
    }

    /// Human-readable names of the known bits that are set
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Permissions {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

// The platform transmits permission sets as decimal strings.
impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(bits) => Ok(Self(bits)),
            Raw::Text(text) => text
                .parse()
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Whom a channel overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(RoleId),
    Member(UserId),
}

/// A per-channel allow/deny overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl PermissionOverwrite {
    pub fn for_role(role: RoleId, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Role(role),
            allow,
            deny,
        }
    }

    /// True if this overwrite denies every bit of `denied` and allows none of them
    pub fn denies_all(&self, denied: Permissions) -> bool {
        self.deny.contains(denied) && !self.allow.intersects(denied)
    }

    /// True if this overwrite allows every bit of `allowed` and denies none of them
    pub fn allows_all(&self, allowed: Permissions) -> bool {
        self.allow.contains(allowed) && !self.deny.intersects(allowed)
    }
}

/// Community-wide permissions of a member, before channel overwrites.
///
/// Owners and administrators implicitly hold every permission.
pub fn base_permissions(
    everyone: Permissions,
    member_roles: impl IntoIterator<Item = Permissions>,
    is_owner: bool,
) -> Permissions {
    if is_owner {
        return Permissions::all();
    }

    let mut permissions = everyone;
    for role in member_roles {
        permissions |= role;
    }

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

/// Apply a channel's overwrites to a member's base permissions.
///
/// Order: `@everyone` overwrite, then the union of the member's role
/// overwrites, then the member-specific overwrite. Denies are applied before
/// allows at each step.
pub fn channel_permissions(
    base: Permissions,
    everyone_role: RoleId,
    member_roles: &[RoleId],
    user: UserId,
    overwrites: &[PermissionOverwrite],
) -> Permissions {
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let mut permissions = base;

    if let Some(everyone) = overwrites
        .iter()
        .find(|o| o.target == OverwriteTarget::Role(everyone_role))
    {
        permissions = permissions.difference(everyone.deny).union(everyone.allow);
    }

    let mut role_allow = Permissions::empty();
    let mut role_deny = Permissions::empty();
    for overwrite in overwrites {
        if let OverwriteTarget::Role(role) = overwrite.target
            && role != everyone_role
            && member_roles.contains(&role)
        {
            role_allow |= overwrite.allow;
            role_deny |= overwrite.deny;
        }
    }
    permissions = permissions.difference(role_deny).union(role_allow);

    if let Some(member) = overwrites
        .iter()
        .find(|o| o.target == OverwriteTarget::Member(user))
    {
        permissions = permissions.difference(member.deny).union(member.allow);
    }

    permissions
}

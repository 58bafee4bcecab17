//! Discord REST payloads and their conversion into port types.
//!
//! Only the fields the bot reads are modelled. Snowflakes and permission
//! sets arrive as decimal strings; the domain id and [`Permissions`] types
//! deserialize them directly.

use super::error::DiscordError;
use kindergarten_application::ports::platform::{ChannelInfo, ChannelKind, MemberInfo};
use kindergarten_domain::core::permissions::base_permissions;
use kindergarten_domain::{
    ChannelId, CommunityId, OverwriteTarget, PermissionOverwrite, Permissions, RoleId,
    RoleSnapshot, UserId,
};
use serde::{Deserialize, Serialize};

// Channel types
const GUILD_TEXT: u8 = 0;
const GUILD_VOICE: u8 = 2;
const GUILD_CATEGORY: u8 = 4;

// Overwrite types
const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMember {
    #[serde(default)]
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRole {
    pub id: RoleId,
    pub name: String,
    pub position: i64,
    pub permissions: Permissions,
}

impl From<ApiRole> for RoleSnapshot {
    fn from(role: ApiRole) -> Self {
        RoleSnapshot {
            id: role.id,
            name: role.name,
            position: role.position,
            permissions: role.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGuild {
    pub id: CommunityId,
    pub owner_id: UserId,
    #[serde(default)]
    pub roles: Vec<ApiRole>,
}

impl ApiGuild {
    /// The `@everyone` role shares the guild's id
    pub fn everyone_role(&self) -> RoleId {
        RoleId::new(self.id.get())
    }

    /// Resolve a member against this guild's roles
    pub fn member_info(&self, user: UserId, member: ApiMember) -> MemberInfo {
        let everyone = self.everyone_role();
        let everyone_permissions = self
            .roles
            .iter()
            .find(|r| r.id == everyone)
            .map(|r| r.permissions)
            .unwrap_or_else(Permissions::empty);

        let member_roles: Vec<&ApiRole> = self
            .roles
            .iter()
            .filter(|r| member.roles.contains(&r.id))
            .collect();
        let top_role_position = member_roles.iter().map(|r| r.position).max().unwrap_or(0);
        let is_owner = self.owner_id == user;
        let permissions = base_permissions(
            everyone_permissions,
            member_roles.iter().map(|r| r.permissions),
            is_owner,
        );

        let (display_name, is_bot) = match member.user {
            Some(api_user) => (
                member
                    .nick
                    .or(api_user.global_name)
                    .unwrap_or(api_user.username),
                api_user.bot,
            ),
            None => (member.nick.unwrap_or_else(|| user.to_string()), false),
        };

        MemberInfo {
            user_id: user,
            display_name,
            role_ids: member.roles,
            is_owner,
            is_bot,
            top_role_position,
            permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOverwrite {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl ApiOverwrite {
    pub fn from_domain(overwrite: &PermissionOverwrite) -> Self {
        let (id, kind) = match overwrite.target {
            OverwriteTarget::Role(role) => (role.to_string(), OVERWRITE_ROLE),
            OverwriteTarget::Member(user) => (user.to_string(), OVERWRITE_MEMBER),
        };
        Self {
            id,
            kind,
            allow: overwrite.allow,
            deny: overwrite.deny,
        }
    }

    /// `None` for unknown overwrite types
    pub fn to_domain(&self) -> Option<PermissionOverwrite> {
        let raw: u64 = self.id.parse().ok()?;
        let target = match self.kind {
            OVERWRITE_ROLE => OverwriteTarget::Role(RoleId::new(raw)),
            OVERWRITE_MEMBER => OverwriteTarget::Member(UserId::new(raw)),
            _ => return None,
        };
        Some(PermissionOverwrite {
            target,
            allow: self.allow,
            deny: self.deny,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChannel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<CommunityId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permission_overwrites: Vec<ApiOverwrite>,
}

impl ApiChannel {
    /// Convert to a [`ChannelInfo`]; channels outside a guild are rejected.
    ///
    /// Guild channel listings omit `guild_id`, so callers that know the
    /// guild pass it as `community`.
    pub fn into_info(self, community: Option<CommunityId>) -> Result<ChannelInfo, DiscordError> {
        let community_id = self
            .guild_id
            .or(community)
            .ok_or_else(|| DiscordError::Decode(format!("channel {} is not in a guild", self.id)))?;

        Ok(ChannelInfo {
            id: self.id,
            community_id,
            name: self.name.unwrap_or_default(),
            kind: channel_kind(self.kind),
            overwrites: self
                .permission_overwrites
                .iter()
                .filter_map(ApiOverwrite::to_domain)
                .collect(),
        })
    }
}

pub fn channel_kind(raw: u8) -> ChannelKind {
    match raw {
        GUILD_TEXT => ChannelKind::Text,
        GUILD_VOICE => ChannelKind::Voice,
        GUILD_CATEGORY => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoleBody<'a> {
    pub name: &'a str,
    pub permissions: Permissions,
    pub hoist: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditRoleBody {
    pub permissions: Permissions,
}

/// Error body returned with 4xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: u64,
}

/// Body of a 429 response, `retry_after` in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitBody {
    pub retry_after: f64,
}

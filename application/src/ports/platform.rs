//! Chat platform port
//!
//! Everything the bot needs from the chat platform: member and role lookups,
//! role assignment, channel introspection and permission overwrites. The
//! Discord REST adapter in the infrastructure layer implements it.
//!
//! Every call may suspend for an arbitrary time. Callers must not hold any
//! registry or attendee lock across a call.

use async_trait::async_trait;
use kindergarten_domain::{
    ChannelId, CommunityId, OverwriteTarget, PermissionOverwrite, Permissions, RoleId,
    RoleSnapshot, UserId,
};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by platform calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    /// True for the two failures that mean a resource is gone for the bot.
    ///
    /// Anything else (rate limits, outages) is transient and must not cause
    /// state to be dropped.
    pub fn is_deletion_signal(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_) | PlatformError::NotFound(_))
    }
}

/// A community member as seen by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub display_name: String,
    pub role_ids: Vec<RoleId>,
    pub is_owner: bool,
    pub is_bot: bool,
    /// Position of the member's highest role (0 for `@everyone` only)
    pub top_role_position: i64,
    /// Community-wide permissions, before channel overwrites
    pub permissions: Permissions,
}

impl MemberInfo {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.role_ids.contains(&role)
    }

    pub fn is_administrator(&self) -> bool {
        self.is_owner || self.permissions.contains(Permissions::ADMINISTRATOR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub community_id: CommunityId,
    pub name: String,
    pub kind: ChannelKind,
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelInfo {
    pub fn role_overwrite(&self, role: RoleId) -> Option<&PermissionOverwrite> {
        self.overwrites
            .iter()
            .find(|o| o.target == OverwriteTarget::Role(role))
    }
}

/// Gateway to the chat platform
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// The bot's own user id
    fn bot_user_id(&self) -> UserId;

    async fn member(&self, community: CommunityId, user: UserId)
    -> Result<MemberInfo, PlatformError>;

    async fn role(&self, community: CommunityId, role: RoleId)
    -> Result<RoleSnapshot, PlatformError>;

    async fn roles(&self, community: CommunityId) -> Result<Vec<RoleSnapshot>, PlatformError>;

    async fn create_role(
        &self,
        community: CommunityId,
        name: &str,
        permissions: Permissions,
    ) -> Result<RoleSnapshot, PlatformError>;

    async fn edit_role_permissions(
        &self,
        community: CommunityId,
        role: RoleId,
        permissions: Permissions,
    ) -> Result<(), PlatformError>;

    async fn grant_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn revoke_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn channel(&self, channel: ChannelId) -> Result<ChannelInfo, PlatformError>;

    async fn community_channels(
        &self,
        community: CommunityId,
    ) -> Result<Vec<ChannelInfo>, PlatformError>;

    /// Effective permissions of `user` in `channel`, overwrites applied
    async fn permissions_in(
        &self,
        community: CommunityId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<Permissions, PlatformError>;

    /// Create or replace the overwrite for the overwrite's target
    async fn put_overwrite(
        &self,
        channel: ChannelId,
        overwrite: PermissionOverwrite,
        reason: &str,
    ) -> Result<(), PlatformError>;
}

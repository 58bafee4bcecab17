//! Discord implementation of the platform port.
//!
//! Every call goes straight to the REST API; nothing is cached here. Member
//! lookups also fetch the guild so role positions, the owner and the
//! `@everyone` permissions are current.

use super::client::DiscordClient;
use super::error::{DiscordError, Result};
use super::models::{
    ApiChannel, ApiGuild, ApiMember, ApiOverwrite, ApiRole, ApiUser, CreateRoleBody, EditRoleBody,
};
use async_trait::async_trait;
use kindergarten_application::ports::platform::{
    ChannelInfo, MemberInfo, PlatformError, PlatformGateway,
};
use kindergarten_domain::core::permissions::channel_permissions;
use kindergarten_domain::{
    ChannelId, CommunityId, PermissionOverwrite, Permissions, RoleId, RoleSnapshot, UserId,
};
use std::time::Duration;
use tracing::{debug, info};

/// [`PlatformGateway`] backed by the Discord REST API
pub struct DiscordGateway {
    client: DiscordClient,
    bot_user: UserId,
}

impl DiscordGateway {
    /// Authenticate and resolve the bot's own user id
    pub async fn connect(token: &str, api_base: &str, timeout: Duration) -> Result<Self> {
        let client = DiscordClient::new(token, api_base, timeout)?;
        let me: ApiUser = client.get("/users/@me").await?;
        info!(user_id = %me.id, "Connected to Discord as {}", me.username);
        Ok(Self {
            client,
            bot_user: me.id,
        })
    }

    async fn guild(&self, community: CommunityId) -> Result<ApiGuild> {
        self.client.get(&format!("/guilds/{}", community)).await
    }

    async fn fetch_member(&self, community: CommunityId, user: UserId) -> Result<MemberInfo> {
        let guild = self.guild(community).await?;
        let member: ApiMember = self
            .client
            .get(&format!("/guilds/{}/members/{}", community, user))
            .await?;
        Ok(guild.member_info(user, member))
    }

    async fn fetch_channel(&self, channel: ChannelId) -> Result<ChannelInfo> {
        let raw: ApiChannel = self.client.get(&format!("/channels/{}", channel)).await?;
        raw.into_info(None)
    }
}

#[async_trait]
impl PlatformGateway for DiscordGateway {
    fn bot_user_id(&self) -> UserId {
        self.bot_user
    }

    async fn member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> std::result::Result<MemberInfo, PlatformError> {
        Ok(self.fetch_member(community, user).await?)
    }

    async fn role(
        &self,
        community: CommunityId,
        role: RoleId,
    ) -> std::result::Result<RoleSnapshot, PlatformError> {
        self.roles(community)
            .await?
            .into_iter()
            .find(|r| r.id == role)
            .ok_or_else(|| PlatformError::NotFound(format!("role {}", role)))
    }

    async fn roles(
        &self,
        community: CommunityId,
    ) -> std::result::Result<Vec<RoleSnapshot>, PlatformError> {
        let roles: Vec<ApiRole> = self
            .client
            .get(&format!("/guilds/{}/roles", community))
            .await?;
        Ok(roles.into_iter().map(RoleSnapshot::from).collect())
    }

    async fn create_role(
        &self,
        community: CommunityId,
        name: &str,
        permissions: Permissions,
    ) -> std::result::Result<RoleSnapshot, PlatformError> {
        let body = CreateRoleBody {
            name,
            permissions,
            hoist: true,
        };
        let role: ApiRole = self
            .client
            .post(&format!("/guilds/{}/roles", community), &body, None)
            .await?;
        Ok(role.into())
    }

    async fn edit_role_permissions(
        &self,
        community: CommunityId,
        role: RoleId,
        permissions: Permissions,
    ) -> std::result::Result<(), PlatformError> {
        self.client
            .patch(
                &format!("/guilds/{}/roles/{}", community, role),
                &EditRoleBody { permissions },
                None,
            )
            .await?;
        Ok(())
    }

    async fn grant_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> std::result::Result<(), PlatformError> {
        self.client
            .put::<()>(
                &format!("/guilds/{}/members/{}/roles/{}", community, user, role),
                None,
                Some(reason),
            )
            .await?;
        debug!(community_id = %community, user_id = %user, role_id = %role, "Role granted");
        Ok(())
    }

    async fn revoke_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> std::result::Result<(), PlatformError> {
        self.client
            .delete(
                &format!("/guilds/{}/members/{}/roles/{}", community, user, role),
                Some(reason),
            )
            .await?;
        debug!(community_id = %community, user_id = %user, role_id = %role, "Role revoked");
        Ok(())
    }

    async fn channel(&self, channel: ChannelId) -> std::result::Result<ChannelInfo, PlatformError> {
        Ok(self.fetch_channel(channel).await?)
    }

    async fn community_channels(
        &self,
        community: CommunityId,
    ) -> std::result::Result<Vec<ChannelInfo>, PlatformError> {
        let raw: Vec<ApiChannel> = self
            .client
            .get(&format!("/guilds/{}/channels", community))
            .await?;
        raw.into_iter()
            .map(|c| c.into_info(Some(community)))
            .collect::<Result<Vec<_>>>()
            .map_err(PlatformError::from)
    }

    async fn permissions_in(
        &self,
        community: CommunityId,
        channel: ChannelId,
        user: UserId,
    ) -> std::result::Result<Permissions, PlatformError> {
        let guild = self.guild(community).await?;
        let member: ApiMember = self
            .client
            .get(&format!("/guilds/{}/members/{}", community, user))
            .await?;
        let info = guild.member_info(user, member);
        let channel = self.fetch_channel(channel).await?;
        if channel.community_id != community {
            return Err(DiscordError::NotFound(format!(
                "channel {} in guild {}",
                channel.id, community
            ))
            .into());
        }

        Ok(channel_permissions(
            info.permissions,
            guild.everyone_role(),
            &info.role_ids,
            user,
            &channel.overwrites,
        ))
    }

    async fn put_overwrite(
        &self,
        channel: ChannelId,
        overwrite: PermissionOverwrite,
        reason: &str,
    ) -> std::result::Result<(), PlatformError> {
        let body = ApiOverwrite::from_domain(&overwrite);
        self.client
            .put(
                &format!("/channels/{}/permissions/{}", channel, body.id),
                Some(&body),
                Some(reason),
            )
            .await?;
        Ok(())
    }
}

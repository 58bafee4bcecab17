//! Configure Zone use case
//!
//! Administrator action that creates or edits a community's kindergarten.
//! Editing keeps the attendee list. After the zone is stored its permissions
//! are synced once so the role is confined right away.

use crate::context::BotContext;
use crate::ports::platform::{ChannelKind, PlatformError};
use crate::use_cases::persistence::PersistenceBridge;
use crate::use_cases::reconcile::{Reconciler, ZoneSyncReport};
use kindergarten_domain::{
    ChannelId, CommunityId, DomainError, Permissions, RoleId, RoleSnapshot, UserId, ZoneSettings,
};
use thiserror::Error;
use tracing::{info, warn};

/// What the bot must hold in the zone channel
pub const REQUIRED_CHANNEL_PERMISSIONS: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::MANAGE_CHANNELS)
    .union(Permissions::MANAGE_ROLES);

#[derive(Error, Debug)]
pub enum ConfigureZoneError {
    #[error("You must be an admin to do this.")]
    NotAdministrator,

    #[error("That is not a text channel of this server.")]
    NotTextChannel,

    #[error("I must have the following permissions in that channel: {0}")]
    MissingBotPermissions(Permissions),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Input for the ConfigureZone use case
#[derive(Debug, Clone)]
pub struct ConfigureZoneInput {
    pub community: CommunityId,
    pub requester: UserId,
    pub channel: ChannelId,
    pub required_votes: u32,
    /// Existing role to use; found by name or created when absent
    pub role: Option<RoleId>,
    pub announce_role: Option<RoleId>,
}

/// Outcome of a successful setup
#[derive(Debug, Clone)]
pub struct SetupReport {
    /// False when an existing zone was edited
    pub created: bool,
    pub role: RoleSnapshot,
    pub role_created: bool,
    pub bot_position: i64,
    /// The bot's top role outranks the zone role
    pub bot_can_manage: bool,
    /// `None` if the initial permission sync failed
    pub sync: Option<ZoneSyncReport>,
}

pub struct ConfigureZoneUseCase {
    ctx: BotContext,
}

impl ConfigureZoneUseCase {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, input: ConfigureZoneInput) -> Result<SetupReport, ConfigureZoneError> {
        let platform = self.ctx.platform.as_ref();

        let requester = platform.member(input.community, input.requester).await?;
        if !requester.is_administrator() {
            return Err(ConfigureZoneError::NotAdministrator);
        }
        if input.required_votes < 1 {
            return Err(DomainError::InvalidThreshold(input.required_votes).into());
        }

        let channel = platform.channel(input.channel).await?;
        if channel.kind != ChannelKind::Text || channel.community_id != input.community {
            return Err(ConfigureZoneError::NotTextChannel);
        }

        let bot_id = platform.bot_user_id();
        let granted = platform
            .permissions_in(input.community, input.channel, bot_id)
            .await?;
        let missing = granted.missing(REQUIRED_CHANNEL_PERMISSIONS);
        if !missing.is_empty() {
            return Err(ConfigureZoneError::MissingBotPermissions(missing));
        }

        let (role, role_created) = self.resolve_role(input.community, input.role).await?;
        let settings = ZoneSettings::new(input.channel, role.id, input.required_votes)?
            .with_announce_role(input.announce_role);

        let upserted = self.ctx.registry.upsert(input.community, settings)?;
        upserted.zone.cache_role(role.clone());
        info!(
            community_id = %input.community,
            channel_id = %input.channel,
            "Kindergarten channel {}: {}",
            if upserted.created { "registered" } else { "edited" },
            channel.name
        );

        PersistenceBridge::new(&self.ctx).save_logged();

        let bot = platform.member(input.community, bot_id).await?;
        let sync = match Reconciler::new(self.ctx.clone())
            .sync_zone(&upserted.zone)
            .await
        {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(community_id = %input.community, error = %e, "Initial permission sync failed");
                None
            }
        };

        Ok(SetupReport {
            created: upserted.created,
            bot_position: bot.top_role_position,
            bot_can_manage: bot.top_role_position > role.position,
            role,
            role_created,
            sync,
        })
    }

    async fn resolve_role(
        &self,
        community: CommunityId,
        requested: Option<RoleId>,
    ) -> Result<(RoleSnapshot, bool), PlatformError> {
        let platform = self.ctx.platform.as_ref();
        if let Some(id) = requested {
            return Ok((platform.role(community, id).await?, false));
        }

        let name = &self.ctx.config.role_name;
        if let Some(existing) = platform
            .roles(community)
            .await?
            .into_iter()
            .find(|r| &r.name == name)
        {
            return Ok((existing, false));
        }

        let created = platform
            .create_role(community, name, Permissions::empty())
            .await?;
        info!(community_id = %community, role_id = %created.id, "Created kindergarten role");
        Ok((created, true))
    }
}

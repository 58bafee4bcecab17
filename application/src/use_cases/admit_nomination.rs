//! Admit Nomination use case
//!
//! Decides whether a member may start a vote against another member. Checks
//! run in a fixed order and the first failing one is reported; see
//! [`RejectionReason`] for the order. Admission records the channel and
//! initiator cooldowns.

use crate::context::BotContext;
use crate::ports::platform::{MemberInfo, PlatformError};
use crate::use_cases::shared::zone_role;
use chrono::{DateTime, TimeDelta, Utc};
use kindergarten_domain::{
    ChannelId, CommunityId, DomainError, RejectionReason, UserId, Zone,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AdmitError {
    #[error(transparent)]
    InvalidDuration(#[from] DomainError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Input for the AdmitNomination use case
#[derive(Debug, Clone)]
pub struct AdmitNominationInput {
    pub community: CommunityId,
    pub channel: ChannelId,
    pub initiator: UserId,
    pub target: UserId,
    pub duration_minutes: u32,
}

/// An admitted nomination, ready to open a voting session
#[derive(Debug, Clone)]
pub struct Nomination {
    pub zone: Arc<Zone>,
    pub channel: ChannelId,
    pub initiator: MemberInfo,
    pub target: MemberInfo,
    pub duration: TimeDelta,
    pub admitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Admission {
    Admitted(Nomination),
    Rejected(RejectionReason),
}

impl Admission {
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Admission::Rejected(reason) => Some(*reason),
            Admission::Admitted(_) => None,
        }
    }
}

pub struct AdmitNominationUseCase {
    ctx: BotContext,
}

impl AdmitNominationUseCase {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, input: AdmitNominationInput) -> Result<Admission, AdmitError> {
        let duration = self.ctx.config.confinement_duration(input.duration_minutes)?;
        let now = self.ctx.clock.now();

        let Some(zone) = self.ctx.registry.find(input.community) else {
            return Ok(reject(RejectionReason::NoZone));
        };
        if zone.channel_id() == input.channel {
            return Ok(reject(RejectionReason::ConfinementChannel));
        }
        if self.ctx.registry.confining_zone(input.target).is_some() {
            return Ok(reject(RejectionReason::TargetAlreadyConfined));
        }
        if input.target == self.ctx.platform.bot_user_id() {
            return Ok(reject(RejectionReason::TargetIsBot));
        }
        if input.target == input.initiator {
            return Ok(reject(RejectionReason::TargetIsInitiator));
        }

        let target = self
            .ctx
            .platform
            .member(input.community, input.target)
            .await?;
        if target.is_owner || self.ctx.config.is_exempt(input.target) {
            return Ok(reject(RejectionReason::TargetExempt));
        }

        if let Some(reason) =
            self.ctx
                .cooldowns
                .blocking_cooldown(input.channel, input.initiator, input.target, now)
        {
            return Ok(reject(reason));
        }

        let role = zone_role(self.ctx.platform.as_ref(), &zone).await?;
        let bot = self
            .ctx
            .platform
            .member(input.community, self.ctx.platform.bot_user_id())
            .await?;
        if bot.top_role_position < role.position {
            return Ok(reject(RejectionReason::BotBelowZoneRole));
        }
        if target.top_role_position > role.position {
            return Ok(reject(RejectionReason::TargetOutranksZoneRole));
        }

        let initiator = self
            .ctx
            .platform
            .member(input.community, input.initiator)
            .await?;

        self.ctx
            .cooldowns
            .record_channel_and_initiator(input.channel, input.initiator, now);

        info!(
            community_id = %input.community,
            initiator = %input.initiator,
            target_id = %input.target,
            "Nomination admitted for {} minutes",
            input.duration_minutes
        );

        Ok(Admission::Admitted(Nomination {
            zone,
            channel: input.channel,
            initiator,
            target,
            duration,
            admitted_at: now,
        }))
    }
}

fn reject(reason: RejectionReason) -> Admission {
    debug!(priority = reason.priority(), "Nomination rejected: {}", reason);
    Admission::Rejected(reason)
}

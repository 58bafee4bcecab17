//! Confinement and release of attendees
//!
//! Registry state is authoritative. Role changes on the platform are applied
//! after the registry has been updated and never roll it back; a failed grant
//! is reported to the caller and left for the expiry loop to re-assert.

use crate::context::BotContext;
use crate::ports::platform::PlatformError;
use crate::use_cases::persistence::PersistenceBridge;
use crate::use_cases::shared::{REASON_CONFINED, REASON_FREED};
use chrono::TimeDelta;
use kindergarten_domain::{Attendee, CommunityId, DomainError, UserId, Zone};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfinementError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("User {0} may not use the administrative override")]
    NotPermitted(UserId),
}

/// A recorded confinement and the side effects that did not go through
#[derive(Debug, Clone)]
pub struct Confinement {
    pub attendee: Attendee,
    pub warnings: Vec<String>,
}

/// Result of a manual early-release check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    NoZone,
    /// The user was not an attendee but still held the role; it was removed
    StrayRoleRemoved,
    NotConfined,
    Freed,
    StillConfined { remaining: TimeDelta },
}

impl ReleaseOutcome {
    pub fn is_freed(&self) -> bool {
        matches!(self, ReleaseOutcome::Freed | ReleaseOutcome::StrayRoleRemoved)
    }
}

/// Adds and removes attendees and keeps their role in line
#[derive(Clone)]
pub struct ConfinementService {
    ctx: BotContext,
    persistence: PersistenceBridge,
}

impl ConfinementService {
    pub fn new(ctx: BotContext) -> Self {
        let persistence = PersistenceBridge::new(&ctx);
        Self { ctx, persistence }
    }

    /// Confine `user` in the community's zone for `duration` from now.
    ///
    /// Detaches the user from any other zone first. Does not persist.
    pub async fn confine(
        &self,
        community: CommunityId,
        user: UserId,
        duration: TimeDelta,
    ) -> Result<Confinement, DomainError> {
        let end_time = self
            .ctx
            .clock
            .now()
            .checked_add_signed(duration)
            .ok_or_else(|| DomainError::InvalidDuration(format!("{} is out of range", duration)))?;
        let placement = self.ctx.registry.confine(community, user, end_time)?;
        let mut warnings = Vec::new();

        if let Some(previous) = placement.detached_from {
            info!(
                user_id = %user,
                from = %previous.community_id(),
                to = %community,
                "Moved attendee to another kindergarten"
            );
            if let Err(e) = self
                .ctx
                .platform
                .revoke_role(previous.community_id(), user, previous.role_id(), REASON_FREED)
                .await
            {
                warn!(user_id = %user, community_id = %previous.community_id(), error = %e, "Failed to remove the previous kindergarten role");
            }
        }

        let role = placement.zone.role_id();
        if let Err(e) = self
            .ctx
            .platform
            .grant_role(community, user, role, REASON_CONFINED)
            .await
        {
            warn!(user_id = %user, community_id = %community, error = %e, "Failed to assign the kindergarten role");
            warnings.push(format!("The kindergarten role could not be assigned: {}", e));
        }

        info!(user_id = %user, community_id = %community, until = %end_time, "User sent to kindergarten");
        Ok(Confinement {
            attendee: placement.attendee,
            warnings,
        })
    }

    /// Remove `user` from the zone, then revoke the role.
    ///
    /// The attendee is gone even when the revoke fails; the error is returned
    /// so the caller can log it. A member who already left counts as revoked.
    pub async fn free(&self, zone: &Zone, user: UserId) -> Result<Option<Attendee>, PlatformError> {
        let Some(attendee) = zone.attendees().remove(user) else {
            return Ok(None);
        };

        match self
            .ctx
            .platform
            .revoke_role(zone.community_id(), user, zone.role_id(), REASON_FREED)
            .await
        {
            Ok(()) => {}
            Err(PlatformError::NotFound(_)) => {
                debug!(user_id = %user, "Freed attendee is no longer a member");
            }
            Err(e) => return Err(e),
        }

        info!(user_id = %user, community_id = %zone.community_id(), "User freed from kindergarten");
        Ok(Some(attendee))
    }

    /// Grant the zone role to an attendee who lost it.
    ///
    /// Returns true if the role had to be granted. Attendees who left the
    /// community are skipped; re-joining re-asserts the role.
    pub async fn ensure_role_assigned(
        &self,
        zone: &Zone,
        attendee: &Attendee,
    ) -> Result<bool, PlatformError> {
        let community = zone.community_id();
        let member = match self.ctx.platform.member(community, attendee.user_id).await {
            Ok(member) => member,
            Err(PlatformError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        let role = zone.role_id();
        if member.has_role(role) {
            return Ok(false);
        }

        self.ctx
            .platform
            .grant_role(community, attendee.user_id, role, REASON_CONFINED)
            .await?;
        debug!(user_id = %attendee.user_id, community_id = %community, "Re-assigned kindergarten role");
        Ok(true)
    }

    /// Free the user if their time is up; clean up a stray role otherwise.
    pub async fn check_and_maybe_free(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<ReleaseOutcome, ConfinementError> {
        let Some(zone) = self.ctx.registry.find(community) else {
            return Ok(ReleaseOutcome::NoZone);
        };

        let Some(attendee) = zone.attendees().find(user) else {
            let member = self.ctx.platform.member(community, user).await?;
            let role = zone.role_id();
            if !member.has_role(role) {
                return Ok(ReleaseOutcome::NotConfined);
            }

            self.ctx
                .platform
                .revoke_role(community, user, role, REASON_FREED)
                .await?;
            info!(user_id = %user, community_id = %community, "Removed kindergarten role from a non-attendee");
            return Ok(ReleaseOutcome::StrayRoleRemoved);
        };

        let now = self.ctx.clock.now();
        if !attendee.is_expired(now) {
            return Ok(ReleaseOutcome::StillConfined {
                remaining: attendee.remaining(now),
            });
        }

        let freed = self.free(&zone, user).await;
        self.persistence.save_logged();
        freed?;
        Ok(ReleaseOutcome::Freed)
    }

    /// Free and optionally re-confine a user, bypassing every check.
    ///
    /// Only exempt users may call this. Returns the new attendee when `lock`
    /// is set.
    pub async fn admin_override(
        &self,
        requester: UserId,
        community: CommunityId,
        user: UserId,
        lock: bool,
        duration_seconds: u64,
    ) -> Result<Option<Confinement>, ConfinementError> {
        if !self.ctx.config.is_exempt(requester) {
            return Err(ConfinementError::NotPermitted(requester));
        }

        let zone = self
            .ctx
            .registry
            .find(community)
            .ok_or(DomainError::UnknownZone(community))?;

        if let Err(e) = self.free(&zone, user).await {
            warn!(user_id = %user, error = %e, "Override could not revoke the kindergarten role");
        }

        let confinement = if lock {
            let seconds = i64::try_from(duration_seconds).unwrap_or(i64::MAX);
            let duration = TimeDelta::try_seconds(seconds).unwrap_or(TimeDelta::MAX);
            Some(self.confine(community, user, duration).await?)
        } else {
            None
        };

        info!(requester = %requester, user_id = %user, lock, "Administrative override applied");
        self.persistence.save_logged();
        Ok(confinement)
    }

    /// Re-assert the role when an attendee re-joins the community.
    ///
    /// Returns true if the user is an attendee and the role was granted.
    pub async fn on_member_joined(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<bool, PlatformError> {
        let Some(zone) = self.ctx.registry.find(community) else {
            return Ok(false);
        };
        if !zone.attendees().contains(user) {
            return Ok(false);
        }

        self.ctx
            .platform
            .grant_role(community, user, zone.role_id(), REASON_CONFINED)
            .await?;
        info!(user_id = %user, community_id = %community, "Attendee re-joined, role re-assigned");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::test_support::{COMMUNITY, Call, TestHarness, ZONE_ROLE, member};
    use kindergarten_domain::{ChannelId, CommunityId, RoleId, ZoneSettings};

    const USER: UserId = UserId::new(5);
    const OWNER: UserId = UserId::new(77);

    fn harness() -> TestHarness {
        let harness = TestHarness::with_config(
            BotConfig::default().with_exempt_users(vec![OWNER]),
        )
        .with_zone(3);
        harness.platform.add_member(member(USER, 1));
        harness
    }

    #[tokio::test(start_paused = true)]
    async fn test_confine_grants_role() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());

        let confinement = service
            .confine(COMMUNITY, USER, TimeDelta::minutes(30))
            .await
            .unwrap();

        assert!(confinement.warnings.is_empty());
        assert!(harness.zone().attendees().contains(USER));
        assert!(harness.platform.member_has_role(USER, ZONE_ROLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_grant_keeps_attendee() {
        let harness = harness();
        harness.platform.fail_grants_for(USER);
        let service = ConfinementService::new(harness.ctx.clone());

        let confinement = service
            .confine(COMMUNITY, USER, TimeDelta::minutes(30))
            .await
            .unwrap();

        assert_eq!(confinement.warnings.len(), 1);
        assert!(harness.zone().attendees().contains(USER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confine_elsewhere_detaches() {
        let harness = harness();
        let other = CommunityId::new(2);
        let other_role = RoleId::new(21);
        harness
            .ctx
            .registry
            .upsert(other, ZoneSettings::new(ChannelId::new(40), other_role, 2).unwrap())
            .unwrap();
        let service = ConfinementService::new(harness.ctx.clone());

        service
            .confine(other, USER, TimeDelta::minutes(10))
            .await
            .unwrap();
        service
            .confine(COMMUNITY, USER, TimeDelta::minutes(10))
            .await
            .unwrap();

        assert!(harness.zone().attendees().contains(USER));
        let other_zone = harness.ctx.registry.find(other).unwrap();
        assert!(!other_zone.attendees().contains(USER));
        assert!(harness.platform.calls().contains(&Call::Revoke {
            user: USER,
            role: other_role
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_and_maybe_free_outcomes() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());

        assert_eq!(
            service.check_and_maybe_free(CommunityId::new(9), USER).await.unwrap(),
            ReleaseOutcome::NoZone
        );
        assert_eq!(
            service.check_and_maybe_free(COMMUNITY, USER).await.unwrap(),
            ReleaseOutcome::NotConfined
        );

        service
            .confine(COMMUNITY, USER, TimeDelta::minutes(30))
            .await
            .unwrap();
        assert_eq!(
            service.check_and_maybe_free(COMMUNITY, USER).await.unwrap(),
            ReleaseOutcome::StillConfined {
                remaining: TimeDelta::minutes(30)
            }
        );

        harness.clock.advance(TimeDelta::minutes(30));
        assert_eq!(
            service.check_and_maybe_free(COMMUNITY, USER).await.unwrap(),
            ReleaseOutcome::Freed
        );
        assert!(!harness.platform.member_has_role(USER, ZONE_ROLE));
        assert!(harness.store.saved().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stray_role_is_removed() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());
        harness
            .platform
            .add_member(member_with_zone_role());

        let outcome = service.check_and_maybe_free(COMMUNITY, USER).await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::StrayRoleRemoved);
        assert!(!harness.platform.member_has_role(USER, ZONE_ROLE));
    }

    fn member_with_zone_role() -> crate::ports::platform::MemberInfo {
        let mut info = member(USER, 1);
        info.role_ids.push(ZONE_ROLE);
        info
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_override_requires_exempt_user() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());

        let result = service
            .admin_override(USER, COMMUNITY, USER, true, 60)
            .await;
        assert!(matches!(result, Err(ConfinementError::NotPermitted(_))));

        let confinement = service
            .admin_override(OWNER, COMMUNITY, USER, true, 90)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            confinement.attendee.end_time,
            harness.clock.now() + TimeDelta::seconds(90)
        );

        let released = service
            .admin_override(OWNER, COMMUNITY, USER, false, 0)
            .await
            .unwrap();
        assert!(released.is_none());
        assert!(!harness.zone().attendees().contains(USER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_duration_is_rejected() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());

        let result = service
            .admin_override(OWNER, COMMUNITY, USER, true, u64::MAX)
            .await;
        assert!(matches!(
            result,
            Err(ConfinementError::Domain(DomainError::InvalidDuration(_)))
        ));

        let result = service.confine(COMMUNITY, USER, TimeDelta::MAX).await;
        assert!(matches!(result, Err(DomainError::InvalidDuration(_))));
        assert!(!harness.zone().attendees().contains(USER));
        assert!(!harness.platform.member_has_role(USER, ZONE_ROLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejoin_reassigns_role() {
        let harness = harness();
        let service = ConfinementService::new(harness.ctx.clone());
        service
            .confine(COMMUNITY, USER, TimeDelta::hours(1))
            .await
            .unwrap();
        harness.platform.remove_role_from(USER, ZONE_ROLE);

        assert!(service.on_member_joined(COMMUNITY, USER).await.unwrap());
        assert!(harness.platform.member_has_role(USER, ZONE_ROLE));
        assert!(!service.on_member_joined(COMMUNITY, UserId::new(6)).await.unwrap());
    }
}

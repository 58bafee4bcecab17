//! Reconciliation loops
//!
//! Three independent periodic tasks re-derive platform state from the
//! registry:
//!
//! | Loop | Default period | Work |
//! |------|----------------|------|
//! | expiry | 60 s | free expired attendees, re-assert the role on the rest, save |
//! | permission sync | 600 s | strip view bits from the zone role, allow it in the zone channel, deny it everywhere else |
//! | prune | 300 s | drop zones whose channel is gone for the bot |
//!
//! Failures are logged per item and never abort a pass. Nothing is retried
//! within a pass; the next tick simply tries again.

use crate::context::BotContext;
use crate::ports::platform::{ChannelKind, PlatformError};
use crate::use_cases::confinement::ConfinementService;
use crate::use_cases::persistence::PersistenceBridge;
use crate::use_cases::shared::{REASON_DENY_OVERWRITE, REASON_ZONE_ACCESS, zone_role};
use kindergarten_domain::{PermissionOverwrite, Permissions, RoleSnapshot, Zone};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Granted to the zone role inside the zone channel
pub const ZONE_CHANNEL_ALLOW: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::ADD_REACTIONS);

/// Denied to the zone role everywhere else
pub const OUTSIDE_DENY: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

/// The bot needs these in a channel to edit its overwrites
const MANAGE_REQUIRED: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::MANAGE_CHANNELS);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub freed: usize,
    pub reassigned: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneSyncReport {
    pub role_stripped: bool,
    pub zone_channel_updated: bool,
    pub denies_written: usize,
    pub skipped: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub zones: usize,
    pub denies_written: usize,
    pub failed_zones: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub checked: usize,
    pub removed: usize,
}

/// Handles of the spawned loops
pub struct ReconcileHandles {
    pub expiry: JoinHandle<()>,
    pub permissions: JoinHandle<()>,
    pub prune: JoinHandle<()>,
}

impl ReconcileHandles {
    /// Wait for every loop to stop after the shutdown token was cancelled
    pub async fn join(self) {
        for (name, handle) in [
            ("expiry", self.expiry),
            ("permissions", self.permissions),
            ("prune", self.prune),
        ] {
            if let Err(e) = handle.await {
                warn!(error = %e, "{} loop ended abnormally", name);
            }
        }
    }
}

pub struct Reconciler {
    ctx: BotContext,
    confinement: ConfinementService,
    persistence: PersistenceBridge,
}

impl Reconciler {
    pub fn new(ctx: BotContext) -> Self {
        Self {
            confinement: ConfinementService::new(ctx.clone()),
            persistence: PersistenceBridge::new(&ctx),
            ctx,
        }
    }

    // ==================== Expiry ====================

    /// One pass of the expiry loop. Always saves state at the end.
    pub async fn expire_attendees(&self) -> ExpiryReport {
        let mut report = ExpiryReport::default();

        for zone in self.ctx.registry.zones() {
            for attendee in zone.attendees().snapshot() {
                let now = self.ctx.clock.now();
                if attendee.is_expired(now) {
                    match self.confinement.free(&zone, attendee.user_id).await {
                        Ok(Some(_)) => report.freed += 1,
                        Ok(None) => {}
                        Err(e) => {
                            warn!(user_id = %attendee.user_id, community_id = %zone.community_id(), error = %e, "Failed to free attendee");
                            report.failures += 1;
                        }
                    }
                } else {
                    match self.confinement.ensure_role_assigned(&zone, &attendee).await {
                        Ok(true) => report.reassigned += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(user_id = %attendee.user_id, community_id = %zone.community_id(), error = %e, "Failed to re-assert kindergarten role");
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        self.persistence.save_logged();
        if report.freed > 0 || report.reassigned > 0 {
            info!(
                "Expiry pass: {} freed, {} re-assigned, {} failures",
                report.freed, report.reassigned, report.failures
            );
        }
        report
    }

    // ==================== Permission Sync ====================

    pub async fn sync_permissions(&self) -> SyncReport {
        let mut report = SyncReport::default();

        for zone in self.ctx.registry.zones() {
            report.zones += 1;
            match self.sync_zone(&zone).await {
                Ok(zone_report) => report.denies_written += zone_report.denies_written,
                Err(e) => {
                    warn!(community_id = %zone.community_id(), error = %e, "Failed to sync kindergarten permissions");
                    report.failed_zones += 1;
                }
            }
        }

        debug!(
            "Permission sync: {} zones, {} overwrites written, {} failed",
            report.zones, report.denies_written, report.failed_zones
        );
        report
    }

    /// Make the zone role's channel access match the zone.
    ///
    /// Role permission bits alone cannot express "only this channel", so
    /// confinement is carried by overwrites: an allow in the zone channel and
    /// a deny on every category the bot can manage.
    pub async fn sync_zone(&self, zone: &Zone) -> Result<ZoneSyncReport, PlatformError> {
        let mut report = ZoneSyncReport::default();
        let community = zone.community_id();
        let platform = self.ctx.platform.as_ref();

        let role = zone_role(platform, zone).await?;
        if role.permissions.intersects(Permissions::VIEW_CHANNEL) {
            platform
                .edit_role_permissions(community, role.id, Permissions::empty())
                .await?;
            zone.cache_role(RoleSnapshot {
                permissions: Permissions::empty(),
                ..role.clone()
            });
            info!(community_id = %community, role_id = %role.id, "Removed implicit channel access from kindergarten role");
            report.role_stripped = true;
        }

        let channels = platform.community_channels(community).await?;
        let zone_channel = zone.channel_id();

        let zone_allows = channels
            .iter()
            .find(|c| c.id == zone_channel)
            .and_then(|c| c.role_overwrite(role.id))
            .is_some_and(|o| o.allows_all(ZONE_CHANNEL_ALLOW));
        if !zone_allows {
            platform
                .put_overwrite(
                    zone_channel,
                    PermissionOverwrite::for_role(role.id, ZONE_CHANNEL_ALLOW, Permissions::empty()),
                    REASON_ZONE_ACCESS,
                )
                .await?;
            report.zone_channel_updated = true;
        }

        let bot = platform.bot_user_id();
        for channel in channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Category && c.id != zone_channel)
        {
            let permissions = match platform.permissions_in(community, channel.id, bot).await {
                Ok(permissions) => permissions,
                Err(e) => {
                    warn!(channel_id = %channel.id, error = %e, "Failed to read bot permissions");
                    report.failures += 1;
                    continue;
                }
            };
            if !permissions.contains(MANAGE_REQUIRED) {
                debug!(channel_id = %channel.id, "Bot does not have permissions to manage {}", channel.name);
                report.skipped += 1;
                continue;
            }

            let already_denied = channel
                .role_overwrite(role.id)
                .is_some_and(|o| o.denies_all(OUTSIDE_DENY));
            if already_denied {
                continue;
            }

            match platform
                .put_overwrite(
                    channel.id,
                    PermissionOverwrite::for_role(role.id, Permissions::empty(), OUTSIDE_DENY),
                    REASON_DENY_OVERWRITE,
                )
                .await
            {
                Ok(()) => report.denies_written += 1,
                Err(e) => {
                    warn!(channel_id = %channel.id, error = %e, "Failed to write deny overwrite");
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    // ==================== Prune ====================

    /// Drop zones whose channel the bot can no longer reach.
    ///
    /// Only "not found" and "forbidden" count; transient failures keep the zone.
    pub async fn prune_zones(&self) -> PruneReport {
        let mut report = PruneReport::default();

        for zone in self.ctx.registry.zones() {
            report.checked += 1;
            let channel = zone.channel_id();
            match self.ctx.platform.channel(channel).await {
                Ok(_) => {}
                Err(e) if e.is_deletion_signal() => {
                    // Skip if the zone moved to another channel meanwhile
                    if zone.channel_id() != channel {
                        continue;
                    }
                    if self.ctx.registry.remove(zone.community_id()).is_some() {
                        info!(
                            community_id = %zone.community_id(),
                            channel_id = %channel,
                            "Lost access to kindergarten channel, zone removed"
                        );
                        report.removed += 1;
                    }
                }
                Err(e) => {
                    warn!(channel_id = %channel, error = %e, "Could not check kindergarten channel");
                }
            }
        }

        if report.removed > 0 {
            self.persistence.save_logged();
        }
        report
    }

    // ==================== Scheduling ====================

    /// Spawn the three loops. Each first runs one full period after start and
    /// stops when `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> ReconcileHandles {
        let config = Arc::clone(&self.ctx.config);

        let reconciler = Arc::clone(&self);
        let expiry = spawn_loop("expiry", config.expiry_interval, shutdown.clone(), move || {
            let reconciler = Arc::clone(&reconciler);
            async move {
                reconciler.expire_attendees().await;
            }
        });

        let reconciler = Arc::clone(&self);
        let permissions = spawn_loop(
            "permissions",
            config.permission_sync_interval,
            shutdown.clone(),
            move || {
                let reconciler = Arc::clone(&reconciler);
                async move {
                    reconciler.sync_permissions().await;
                }
            },
        );

        let reconciler = self;
        let prune = spawn_loop("prune", config.prune_interval, shutdown, move || {
            let reconciler = Arc::clone(&reconciler);
            async move {
                reconciler.prune_zones().await;
            }
        });

        ReconcileHandles {
            expiry,
            permissions,
            prune,
        }
    }
}

fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let first_tick = Instant::now() + period;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("{} loop started, period {:?}", name, period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => tick().await,
            }
        }

        debug!("{} loop stopped", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        BOT, COMMUNITY, Call, GENERAL, TestHarness, ZONE_CHANNEL, ZONE_ROLE, member, text_channel,
    };
    use chrono::TimeDelta;
    use kindergarten_domain::{ChannelId, UserId};

    const CATEGORY_A: ChannelId = ChannelId::new(30);
    const CATEGORY_B: ChannelId = ChannelId::new(31);

    fn harness() -> TestHarness {
        TestHarness::new().with_zone(3)
    }

    fn confine(harness: &TestHarness, user: UserId, for_minutes: i64) {
        harness.platform.add_member(member(user, 1));
        harness
            .ctx
            .registry
            .confine(
                COMMUNITY,
                user,
                harness.clock.now() + TimeDelta::minutes(for_minutes),
            )
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_frees_and_reasserts() {
        let harness = harness();
        let expired = UserId::new(1);
        let active = UserId::new(2);
        confine(&harness, expired, -5);
        confine(&harness, active, 30);

        let report = Reconciler::new(harness.ctx.clone()).expire_attendees().await;

        assert_eq!(report.freed, 1);
        assert_eq!(report.reassigned, 1);
        assert!(!harness.zone().attendees().contains(expired));
        assert!(harness.platform.member_has_role(active, ZONE_ROLE));
        assert_eq!(harness.store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_continues_after_failed_revoke() {
        let harness = harness();
        let first = UserId::new(1);
        let second = UserId::new(2);
        confine(&harness, first, -5);
        confine(&harness, second, -5);
        harness.platform.fail_revokes_for(first);

        let report = Reconciler::new(harness.ctx.clone()).expire_attendees().await;

        assert_eq!(report.failures, 1);
        assert_eq!(report.freed, 1);
        assert!(harness.zone().attendees().is_empty());

        let revokes: Vec<_> = harness
            .platform
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Revoke { .. }))
            .collect();
        assert_eq!(
            revokes,
            vec![
                Call::Revoke { user: first, role: ZONE_ROLE },
                Call::Revoke { user: second, role: ZONE_ROLE },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_saves_even_when_idle() {
        let harness = harness();
        Reconciler::new(harness.ctx.clone()).expire_attendees().await;
        assert_eq!(harness.store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_writes_overwrites() {
        let harness = harness();
        harness
            .platform
            .add_channel(text_channel(CATEGORY_A, ChannelKind::Category));
        harness
            .platform
            .add_channel(text_channel(CATEGORY_B, ChannelKind::Category));
        harness
            .platform
            .set_permissions(CATEGORY_B, BOT, Permissions::VIEW_CHANNEL);

        let reconciler = Reconciler::new(harness.ctx.clone());
        let report = reconciler.sync_zone(&harness.zone()).await.unwrap();

        assert!(report.zone_channel_updated);
        assert_eq!(report.denies_written, 1);
        assert_eq!(report.skipped, 1);

        let allow = harness.overwrite_for(ZONE_CHANNEL, ZONE_ROLE).unwrap();
        assert!(allow.allows_all(ZONE_CHANNEL_ALLOW));
        let deny = harness.overwrite_for(CATEGORY_A, ZONE_ROLE).unwrap();
        assert!(deny.denies_all(OUTSIDE_DENY));
        assert!(harness.overwrite_for(CATEGORY_B, ZONE_ROLE).is_none());
        // Plain text channels inherit from their category
        assert!(harness.overwrite_for(GENERAL, ZONE_ROLE).is_none());

        // Second pass has nothing to do
        harness.platform.clear_calls();
        let report = reconciler.sync_zone(&harness.zone()).await.unwrap();
        assert_eq!(report, ZoneSyncReport { skipped: 1, ..Default::default() });
        assert!(harness.platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_strips_view_from_role() {
        let harness = harness();
        harness.platform.add_role(RoleSnapshot {
            id: ZONE_ROLE,
            name: "Kindergarten Attendee".to_string(),
            position: 10,
            permissions: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
        });

        let reconciler = Reconciler::new(harness.ctx.clone());
        let report = reconciler.sync_zone(&harness.zone()).await.unwrap();
        assert!(report.role_stripped);
        assert!(harness.platform.calls().contains(&Call::EditRole {
            role: ZONE_ROLE,
            permissions: Permissions::empty()
        }));

        let report = reconciler.sync_zone(&harness.zone()).await.unwrap();
        assert!(!report.role_stripped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_only_on_deletion_signals() {
        let harness = harness();
        let reconciler = Reconciler::new(harness.ctx.clone());

        harness.platform.fail_channel(
            ZONE_CHANNEL,
            PlatformError::RateLimited { retry_after: None },
        );
        assert_eq!(reconciler.prune_zones().await.removed, 0);
        assert_eq!(harness.ctx.registry.len(), 1);

        harness
            .platform
            .fail_channel(ZONE_CHANNEL, PlatformError::Forbidden("no access".into()));
        assert_eq!(reconciler.prune_zones().await.removed, 1);
        assert!(harness.ctx.registry.is_empty());
        assert!(harness.store.saved().unwrap().zones.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loops_run_on_schedule_and_stop() {
        let harness = harness();
        let shutdown = CancellationToken::new();
        let handles = Arc::new(Reconciler::new(harness.ctx.clone())).spawn(shutdown.clone());

        tokio::time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert_eq!(harness.store.save_count(), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(harness.store.save_count(), 1);

        shutdown.cancel();
        handles.join().await;
    }
}

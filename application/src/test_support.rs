//! In-memory port implementations for use case tests.

use crate::config::BotConfig;
use crate::context::BotContext;
use crate::ports::clock::Clock;
use crate::ports::platform::{ChannelInfo, ChannelKind, MemberInfo, PlatformError, PlatformGateway};
use crate::ports::state_store::{StateStore, StoreError};
use crate::ports::tally_view::TallyView;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use kindergarten_domain::util::lock;
use kindergarten_domain::{
    ChannelId, CommunityId, OverwriteTarget, PermissionOverwrite, Permissions, RoleId,
    RoleSnapshot, TallySnapshot, UserId, Zone, ZoneSettings,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BOT: UserId = UserId::new(999);
pub const COMMUNITY: CommunityId = CommunityId::new(1);
pub const ZONE_CHANNEL: ChannelId = ChannelId::new(10);
pub const GENERAL: ChannelId = ChannelId::new(11);
pub const ZONE_ROLE: RoleId = RoleId::new(20);

/// Mutating platform call, recorded in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Grant { user: UserId, role: RoleId },
    Revoke { user: UserId, role: RoleId },
    CreateRole { name: String },
    EditRole { role: RoleId, permissions: Permissions },
    PutOverwrite { channel: ChannelId, overwrite: PermissionOverwrite },
}

#[derive(Default)]
struct PlatformState {
    members: HashMap<(CommunityId, UserId), MemberInfo>,
    roles: HashMap<(CommunityId, RoleId), RoleSnapshot>,
    channels: HashMap<ChannelId, ChannelInfo>,
    permissions: HashMap<(ChannelId, UserId), Permissions>,
    channel_errors: HashMap<ChannelId, PlatformError>,
    failing_grants: HashSet<UserId>,
    failing_revokes: HashSet<UserId>,
    calls: Vec<Call>,
}

/// Scriptable platform that records every mutating call
pub struct MockPlatform {
    state: Mutex<PlatformState>,
    role_lookups: AtomicUsize,
    next_id: AtomicUsize,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            role_lookups: AtomicUsize::new(0),
            next_id: AtomicUsize::new(5000),
        }
    }
}

pub fn member(user: UserId, top_role_position: i64) -> MemberInfo {
    MemberInfo {
        user_id: user,
        display_name: format!("user{}", user),
        role_ids: Vec::new(),
        is_owner: false,
        is_bot: false,
        top_role_position,
        permissions: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
    }
}

pub fn text_channel(id: ChannelId, kind: ChannelKind) -> ChannelInfo {
    ChannelInfo {
        id,
        community_id: COMMUNITY,
        name: format!("channel-{}", id),
        kind,
        overwrites: Vec::new(),
    }
}

impl MockPlatform {
    pub fn add_member(&self, info: MemberInfo) {
        lock(&self.state)
            .members
            .insert((COMMUNITY, info.user_id), info);
    }

    pub fn add_role(&self, role: RoleSnapshot) {
        lock(&self.state).roles.insert((COMMUNITY, role.id), role);
    }

    pub fn add_channel(&self, channel: ChannelInfo) {
        lock(&self.state).channels.insert(channel.id, channel);
    }

    pub fn set_permissions(&self, channel: ChannelId, user: UserId, permissions: Permissions) {
        lock(&self.state)
            .permissions
            .insert((channel, user), permissions);
    }

    pub fn fail_channel(&self, channel: ChannelId, error: PlatformError) {
        lock(&self.state).channel_errors.insert(channel, error);
    }

    pub fn fail_grants_for(&self, user: UserId) {
        lock(&self.state).failing_grants.insert(user);
    }

    pub fn fail_revokes_for(&self, user: UserId) {
        lock(&self.state).failing_revokes.insert(user);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn member_has_role(&self, user: UserId, role: RoleId) -> bool {
        lock(&self.state)
            .members
            .get(&(COMMUNITY, user))
            .is_some_and(|m| m.has_role(role))
    }

    pub fn remove_role_from(&self, user: UserId, role: RoleId) {
        if let Some(m) = lock(&self.state).members.get_mut(&(COMMUNITY, user)) {
            m.role_ids.retain(|r| *r != role);
        }
    }

    pub fn role_lookups(&self) -> usize {
        self.role_lookups.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        lock(&self.state).calls.push(call);
    }
}

#[async_trait]
impl PlatformGateway for MockPlatform {
    fn bot_user_id(&self) -> UserId {
        BOT
    }

    async fn member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<MemberInfo, PlatformError> {
        lock(&self.state)
            .members
            .get(&(community, user))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("member {}", user)))
    }

    async fn role(
        &self,
        community: CommunityId,
        role: RoleId,
    ) -> Result<RoleSnapshot, PlatformError> {
        self.role_lookups.fetch_add(1, Ordering::SeqCst);
        lock(&self.state)
            .roles
            .get(&(community, role))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("role {}", role)))
    }

    async fn roles(&self, community: CommunityId) -> Result<Vec<RoleSnapshot>, PlatformError> {
        let mut roles: Vec<_> = lock(&self.state)
            .roles
            .iter()
            .filter(|((c, _), _)| *c == community)
            .map(|(_, r)| r.clone())
            .collect();
        roles.sort_by_key(|r| r.position);
        Ok(roles)
    }

    async fn create_role(
        &self,
        community: CommunityId,
        name: &str,
        permissions: Permissions,
    ) -> Result<RoleSnapshot, PlatformError> {
        let id = RoleId::new(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
        let role = RoleSnapshot {
            id,
            name: name.to_string(),
            position: 1,
            permissions,
        };
        self.record(Call::CreateRole {
            name: name.to_string(),
        });
        lock(&self.state).roles.insert((community, id), role.clone());
        Ok(role)
    }

    async fn edit_role_permissions(
        &self,
        community: CommunityId,
        role: RoleId,
        permissions: Permissions,
    ) -> Result<(), PlatformError> {
        self.record(Call::EditRole { role, permissions });
        if let Some(r) = lock(&self.state).roles.get_mut(&(community, role)) {
            r.permissions = permissions;
        }
        Ok(())
    }

    async fn grant_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::Grant { user, role });
        let mut state = lock(&self.state);
        if state.failing_grants.contains(&user) {
            return Err(PlatformError::Forbidden("missing permissions".into()));
        }
        if let Some(m) = state.members.get_mut(&(community, user))
            && !m.role_ids.contains(&role)
        {
            m.role_ids.push(role);
        }
        Ok(())
    }

    async fn revoke_role(
        &self,
        community: CommunityId,
        user: UserId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::Revoke { user, role });
        let mut state = lock(&self.state);
        if state.failing_revokes.contains(&user) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        if let Some(m) = state.members.get_mut(&(community, user)) {
            m.role_ids.retain(|r| *r != role);
        }
        Ok(())
    }

    async fn channel(&self, channel: ChannelId) -> Result<ChannelInfo, PlatformError> {
        let state = lock(&self.state);
        if let Some(error) = state.channel_errors.get(&channel) {
            return Err(error.clone());
        }
        state
            .channels
            .get(&channel)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("channel {}", channel)))
    }

    async fn community_channels(
        &self,
        community: CommunityId,
    ) -> Result<Vec<ChannelInfo>, PlatformError> {
        let mut channels: Vec<_> = lock(&self.state)
            .channels
            .values()
            .filter(|c| c.community_id == community)
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn permissions_in(
        &self,
        _community: CommunityId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<Permissions, PlatformError> {
        Ok(lock(&self.state)
            .permissions
            .get(&(channel, user))
            .copied()
            .unwrap_or(Permissions::all()))
    }

    async fn put_overwrite(
        &self,
        channel: ChannelId,
        overwrite: PermissionOverwrite,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::PutOverwrite { channel, overwrite });
        let mut state = lock(&self.state);
        if let Some(info) = state.channels.get_mut(&channel) {
            info.overwrites.retain(|o| o.target != overwrite.target);
            info.overwrites.push(overwrite);
        }
        Ok(())
    }
}

/// Wall clock that follows tokio's (possibly paused) clock, plus a manual offset
pub struct TestClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
    offset: Mutex<TimeDelta>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            started: tokio::time::Instant::now(),
            offset: Mutex::new(TimeDelta::zero()),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *lock(&self.offset) += by;
    }

    pub fn now(&self) -> DateTime<Utc> {
        Clock::now(self)
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::zero());
        self.base + *lock(&self.offset) + elapsed
    }
}

#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<kindergarten_domain::StateSnapshot>>,
    fail: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn put(&self, snapshot: kindergarten_domain::StateSnapshot) {
        *lock(&self.snapshot) = Some(snapshot);
    }

    pub fn saved(&self) -> Option<kindergarten_domain::StateSnapshot> {
        lock(&self.snapshot).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<kindergarten_domain::StateSnapshot>, StoreError> {
        Ok(lock(&self.snapshot).clone())
    }

    fn save(&self, snapshot: &kindergarten_domain::StateSnapshot) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *lock(&self.snapshot) = Some(snapshot.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingView {
    renders: Mutex<Vec<TallySnapshot>>,
}

impl RecordingView {
    pub fn renders(&self) -> Vec<TallySnapshot> {
        lock(&self.renders).clone()
    }

    pub fn last(&self) -> Option<TallySnapshot> {
        lock(&self.renders).last().cloned()
    }
}

#[async_trait]
impl TallyView for RecordingView {
    async fn render(&self, snapshot: &TallySnapshot) {
        lock(&self.renders).push(snapshot.clone());
    }
}

/// A context wired to in-memory adapters
pub struct TestHarness {
    pub ctx: BotContext,
    pub platform: Arc<MockPlatform>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<TestClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(BotConfig::default())
    }

    pub fn with_config(config: BotConfig) -> Self {
        let platform = Arc::new(MockPlatform::default());
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(TestClock::new());
        let ctx = BotContext::new(
            Arc::clone(&platform) as Arc<dyn PlatformGateway>,
            Arc::clone(&store) as Arc<dyn StateStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            config,
        );
        platform.add_member(MemberInfo {
            is_bot: true,
            ..member(BOT, 50)
        });
        Self {
            ctx,
            platform,
            store,
            clock,
        }
    }

    /// Register the standard zone (channel 10, role 20, position 10) and its channel
    pub fn with_zone(self, required_votes: u32) -> Self {
        self.platform.add_role(RoleSnapshot {
            id: ZONE_ROLE,
            name: "Kindergarten Attendee".to_string(),
            position: 10,
            permissions: Permissions::empty(),
        });
        self.platform
            .add_channel(text_channel(ZONE_CHANNEL, ChannelKind::Text));
        self.platform.add_channel(text_channel(GENERAL, ChannelKind::Text));
        let settings = ZoneSettings::new(ZONE_CHANNEL, ZONE_ROLE, required_votes)
            .unwrap();
        self.ctx
            .registry
            .upsert(COMMUNITY, settings)
            .unwrap();
        self
    }

    pub fn zone(&self) -> Arc<Zone> {
        self.ctx.registry.find(COMMUNITY).unwrap()
    }

    pub fn overwrite_for(&self, channel: ChannelId, role: RoleId) -> Option<PermissionOverwrite> {
        lock(&self.platform.state)
            .channels
            .get(&channel)
            .and_then(|c| {
                c.overwrites
                    .iter()
                    .find(|o| o.target == OverwriteTarget::Role(role))
                    .copied()
            })
    }
}

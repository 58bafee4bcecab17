//! Process-lifetime state shared by every use case.

use crate::config::BotConfig;
use crate::ports::clock::Clock;
use crate::ports::platform::PlatformGateway;
use crate::ports::state_store::StateStore;
use kindergarten_domain::{CooldownLedger, ZoneRegistry};
use std::sync::{Arc, Mutex};

/// Injected state and adapters.
///
/// Cloning is cheap; every clone refers to the same registry, ledger and
/// adapters.
#[derive(Clone)]
pub struct BotContext {
    pub registry: Arc<ZoneRegistry>,
    pub cooldowns: Arc<CooldownLedger>,
    pub platform: Arc<dyn PlatformGateway>,
    pub store: Arc<dyn StateStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<BotConfig>,
    /// Held from snapshot to write so saves reach the store in state order
    pub save_lock: Arc<Mutex<()>>,
}

impl BotContext {
    /// Fresh context with an empty registry and ledger
    pub fn new(
        platform: Arc<dyn PlatformGateway>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        config: BotConfig,
    ) -> Self {
        Self {
            registry: Arc::new(ZoneRegistry::new()),
            cooldowns: Arc::new(CooldownLedger::new(config.cooldown_policy())),
            platform,
            store,
            clock,
            config: Arc::new(config),
            save_lock: Arc::new(Mutex::new(())),
        }
    }
}

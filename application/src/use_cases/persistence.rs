//! Persistence bridge
//!
//! Moves the zone registry and the target cooldowns in and out of the
//! [`StateStore`]. Channel and initiator cooldowns are never persisted.

use crate::context::BotContext;
use crate::ports::state_store::{StateStore, StoreError};
use kindergarten_domain::util::lock;
use kindergarten_domain::{CooldownLedger, StateSnapshot, ZoneRegistry};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// What a successful restore brought back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub zones: usize,
    pub attendees: usize,
    pub target_cooldowns: usize,
}

#[derive(Clone)]
pub struct PersistenceBridge {
    registry: Arc<ZoneRegistry>,
    cooldowns: Arc<CooldownLedger>,
    store: Arc<dyn StateStore>,
    save_lock: Arc<Mutex<()>>,
}

impl PersistenceBridge {
    pub fn new(ctx: &BotContext) -> Self {
        Self {
            registry: Arc::clone(&ctx.registry),
            cooldowns: Arc::clone(&ctx.cooldowns),
            store: Arc::clone(&ctx.store),
            save_lock: Arc::clone(&ctx.save_lock),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            zones: self.registry.to_records(),
            target_cooldowns: self.cooldowns.target_cooldowns(),
        }
    }

    /// Write the full state, replacing whatever was stored before.
    ///
    /// Concurrent saves through any bridge of the same context are
    /// serialized, and each one snapshots after acquiring its turn.
    pub fn save(&self) -> Result<(), StoreError> {
        let _turn = lock(&self.save_lock);
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        debug!(
            "State saved ({} zones, {} attendees)",
            snapshot.zones.len(),
            snapshot.attendee_count()
        );
        Ok(())
    }

    /// Save and log a failure instead of returning it.
    ///
    /// Returns the error text so callers can surface it as a warning.
    pub fn save_logged(&self) -> Option<String> {
        match self.save() {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Failed to save state");
                Some(e.to_string())
            }
        }
    }

    /// Replace in-memory state with the stored snapshot.
    ///
    /// Applies nothing unless the whole snapshot is consistent. Returns an
    /// empty summary when nothing has been stored yet.
    pub fn load(&self) -> Result<RestoreSummary, StoreError> {
        let Some(snapshot) = self.store.load()? else {
            return Ok(RestoreSummary::default());
        };

        let summary = RestoreSummary {
            zones: snapshot.zones.len(),
            attendees: snapshot.attendee_count(),
            target_cooldowns: snapshot.target_cooldowns.len(),
        };

        self.registry.restore(snapshot.zones)?;
        self.cooldowns
            .restore_target_cooldowns(snapshot.target_cooldowns);

        Ok(summary)
    }

    /// Load at startup; on any failure log it and start with empty state
    pub fn restore_or_cold_start(&self) -> RestoreSummary {
        match self.load() {
            Ok(summary) => {
                info!(
                    "State loaded: {} zones, {} attendees, {} target cooldowns",
                    summary.zones, summary.attendees, summary.target_cooldowns
                );
                summary
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state, starting empty");
                RestoreSummary::default()
            }
        }
    }
}

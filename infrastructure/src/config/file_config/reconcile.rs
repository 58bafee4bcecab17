//! Reconciliation loop configuration from TOML (`[reconcile]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReconcileConfig {
    /// Release expired attendees and re-assert roles
    pub expiry_secs: u64,
    /// Rewrite channel overwrites for every zone
    pub permission_sync_secs: u64,
    /// Drop zones whose channel or role is gone
    pub prune_secs: u64,
}

impl Default for FileReconcileConfig {
    fn default() -> Self {
        Self {
            expiry_secs: 60,
            permission_sync_secs: 600,
            prune_secs: 300,
        }
    }
}

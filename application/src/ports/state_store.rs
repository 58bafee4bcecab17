//! Port for durable state storage.
//!
//! The store holds exactly one [`StateSnapshot`]; every save replaces the
//! previous one in full.

use kindergarten_domain::{DomainError, StateSnapshot};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored state is inconsistent: {0}")]
    BrokenReference(#[from] DomainError),
}

pub trait StateStore: Send + Sync {
    /// Read the stored snapshot; `Ok(None)` if nothing has been saved yet
    fn load(&self) -> Result<Option<StateSnapshot>, StoreError>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), StoreError>;
}

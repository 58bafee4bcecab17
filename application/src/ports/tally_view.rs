//! Port for the public tally of a nomination.
//!
//! The view is re-rendered after every counted vote and once more when the
//! vote finishes. Rendering is best-effort: implementations log their own
//! failures and never fail the vote.

use async_trait::async_trait;
use kindergarten_domain::TallySnapshot;

#[async_trait]
pub trait TallyView: Send + Sync {
    async fn render(&self, snapshot: &TallySnapshot);
}

/// No-op implementation for tests and headless runs.
pub struct NoTallyView;

#[async_trait]
impl TallyView for NoTallyView {
    async fn render(&self, _snapshot: &TallySnapshot) {}
}

//! Tally view that writes each rendered card to the log

use crate::output::tally_card::TallyCard;
use async_trait::async_trait;
use kindergarten_application::ports::tally_view::TallyView;
use kindergarten_domain::TallySnapshot;
use kindergarten_domain::util::lock;
use std::sync::Mutex;
use tracing::{info, warn};

/// Renders tally cards into `tracing` events.
///
/// Used when no chat surface is attached; the most recent card is kept for
/// inspection.
#[derive(Default)]
pub struct LogTallyView {
    last: Mutex<Option<TallyCard>>,
}

impl LogTallyView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_card(&self) -> Option<TallyCard> {
        lock(&self.last).clone()
    }
}

#[async_trait]
impl TallyView for LogTallyView {
    async fn render(&self, snapshot: &TallySnapshot) {
        let card = TallyCard::from_snapshot(snapshot);
        if snapshot.is_finished() && card.fields.len() > 2 {
            warn!(target_name = %snapshot.target_name, "{}", card.to_plain_text());
        } else {
            info!(target_name = %snapshot.target_name, "{}", card.to_plain_text());
        }
        *lock(&self.last) = Some(card);
    }
}

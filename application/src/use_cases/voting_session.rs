//! Voting session for an admitted nomination
//!
//! A session is `Open` until it finishes, exactly once, by whichever comes
//! first: the end of the voting window, or the early-finish grace period
//! after the tally reached the threshold and stayed there.
//!
//! ```text
//! open ──cast──▶ total ≥ required ──arm grace timer──▶ (grace elapses) ──▶ finish
//!   │                 │ total drops below: cancel timer
//!   └──────────── voting window elapses ──────────────────────────────────▶ finish
//! ```
//!
//! Finishing with enough votes confines the target and applies the long
//! target cooldown; otherwise only the short failure cooldown is applied.

use crate::context::BotContext;
use crate::ports::tally_view::TallyView;
use crate::use_cases::admit_nomination::Nomination;
use crate::use_cases::confinement::ConfinementService;
use crate::use_cases::persistence::PersistenceBridge;
use chrono::{DateTime, Utc};
use kindergarten_domain::util::lock;
use kindergarten_domain::{Ballot, TallyPhase, TallySnapshot, UserId, VoteTally, VotingOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to a cast vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteReceipt {
    /// The voter's effective ballot did not change
    Unchanged { total: i64 },
    Counted { total: i64 },
    /// The session has already finished
    Closed,
}

/// An armed early-finish timer
struct EarlyFinish {
    at: DateTime<Utc>,
    cancel: CancellationToken,
}

pub struct VotingSession {
    nomination: Nomination,
    required_votes: u32,
    deadline: DateTime<Utc>,
    tally: VoteTally,
    /// At most one timer outstanding; armed and cancelled only under this lock
    early_finish: Mutex<Option<EarlyFinish>>,
    finished: AtomicBool,
    outcome: Mutex<Option<VotingOutcome>>,
    /// Cancelled on finish; parent of every timer the session spawns
    shutdown: CancellationToken,
    ctx: BotContext,
    confinement: ConfinementService,
    persistence: PersistenceBridge,
    view: Arc<dyn TallyView>,
}

impl VotingSession {
    /// Start the vote: render the initial tally and schedule the deadline.
    pub async fn open(
        ctx: BotContext,
        view: Arc<dyn TallyView>,
        nomination: Nomination,
    ) -> Arc<Self> {
        let now = ctx.clock.now();
        let session = Arc::new(Self {
            required_votes: nomination.zone.required_votes(),
            deadline: now + ctx.config.voting_window_delta(),
            tally: VoteTally::new(nomination.target.user_id),
            early_finish: Mutex::new(None),
            finished: AtomicBool::new(false),
            outcome: Mutex::new(None),
            shutdown: CancellationToken::new(),
            confinement: ConfinementService::new(ctx.clone()),
            persistence: PersistenceBridge::new(&ctx),
            nomination,
            ctx,
            view,
        });

        info!(
            initiator = %session.nomination.initiator.user_id,
            target_id = %session.nomination.target.user_id,
            required = session.required_votes,
            "Voting opened"
        );
        session.render().await;

        let window = tokio::time::sleep(session.ctx.config.voting_window);
        let token = session.shutdown.child_token();
        let deadline_session = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = window => {
                    debug!("Voting window elapsed");
                    deadline_session.finish().await;
                }
            }
        });

        session
    }

    pub fn target(&self) -> UserId {
        self.nomination.target.user_id
    }

    pub fn total(&self) -> i64 {
        self.tally.total()
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn outcome(&self) -> Option<VotingOutcome> {
        lock(&self.outcome).clone()
    }

    /// When the armed early-finish timer fires, if one is armed
    pub fn early_finish_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.early_finish).as_ref().map(|e| e.at)
    }

    /// Record a vote. The target's own "against" counts as an abstention.
    pub async fn cast_vote(self: &Arc<Self>, voter: UserId, ballot: Ballot) -> VoteReceipt {
        if self.is_finished() {
            return VoteReceipt::Closed;
        }

        let result = self.tally.cast(voter, ballot);
        if !result.is_changed() {
            return VoteReceipt::Unchanged {
                total: result.total(),
            };
        }

        debug!(
            voter = %voter,
            target_id = %self.target(),
            "Vote counted: {}/{}",
            result.total(),
            self.required_votes
        );
        self.reevaluate_early_finish();
        self.render().await;

        VoteReceipt::Counted {
            total: result.total(),
        }
    }

    /// Arm or cancel the grace timer from the current total.
    ///
    /// Reads the live total under the timer lock, so two votes crossing the
    /// threshold in opposite directions always leave the timer matching the
    /// tally they produced together.
    fn reevaluate_early_finish(self: &Arc<Self>) {
        let mut slot = lock(&self.early_finish);
        if self.is_finished() {
            return;
        }
        let reached = self.tally.reaches(self.required_votes);

        match (reached, slot.is_some()) {
            (true, false) => {
                let grace = tokio::time::sleep(self.ctx.config.early_finish_grace);
                let cancel = self.shutdown.child_token();
                *slot = Some(EarlyFinish {
                    at: self.ctx.clock.now() + self.ctx.config.early_finish_delta(),
                    cancel: cancel.clone(),
                });
                debug!(target_id = %self.target(), "Threshold reached, early finish armed");

                let session = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = grace => {
                            session.on_grace_elapsed(&cancel).await;
                        }
                    }
                });
            }
            (false, true) => {
                if let Some(early) = slot.take() {
                    early.cancel.cancel();
                    debug!(target_id = %self.target(), "Tally dropped below threshold, early finish cancelled");
                }
            }
            _ => {}
        }
    }

    /// Finish if the timer is still armed and the threshold still holds.
    ///
    /// The check and the claim on the session happen under the timer lock,
    /// so a vote that cancels the timer either lands first and stops the
    /// finish, or lands after the session is already closed.
    async fn on_grace_elapsed(&self, timer: &CancellationToken) -> Option<VotingOutcome> {
        let votes = {
            let _slot = lock(&self.early_finish);
            if timer.is_cancelled() || !self.tally.reaches(self.required_votes) {
                return None;
            }
            if self.finished.swap(true, Ordering::AcqRel) {
                return None;
            }
            self.tally.total()
        };
        debug!(target_id = %self.target(), "Threshold held through the grace period");
        Some(self.conclude(votes).await)
    }

    /// Close the vote and apply its outcome.
    ///
    /// Only the first call does anything; later calls return `None`.
    pub async fn finish(&self) -> Option<VotingOutcome> {
        let votes = {
            let _slot = lock(&self.early_finish);
            if self.finished.swap(true, Ordering::AcqRel) {
                return None;
            }
            self.tally.total()
        };
        Some(self.conclude(votes).await)
    }

    /// Apply the outcome for the votes counted when the session closed
    async fn conclude(&self, votes: i64) -> VotingOutcome {
        self.shutdown.cancel();
        lock(&self.early_finish).take();

        let now = self.ctx.clock.now();
        let target = self.target();

        let outcome = if votes >= i64::from(self.required_votes) {
            self.commit(votes, now).await
        } else {
            self.ctx.cooldowns.record_target_failure(target, now);
            info!(target_id = %target, votes, "Vote failed, {} stays", self.nomination.target.display_name);
            VotingOutcome::Spared { votes }
        };

        *lock(&self.outcome) = Some(outcome.clone());
        self.render().await;
        outcome
    }

    async fn commit(&self, votes: i64, now: DateTime<Utc>) -> VotingOutcome {
        let target = self.target();
        let duration = self.nomination.duration;
        let mut until = now + duration;
        let mut warnings = Vec::new();

        match self
            .confinement
            .confine(self.nomination.zone.community_id(), target, duration)
            .await
        {
            Ok(confinement) => {
                until = confinement.attendee.end_time;
                warnings.extend(confinement.warnings);
            }
            Err(e) => {
                warn!(target_id = %target, error = %e, "Vote passed but the user could not be confined");
                warnings.push(e.to_string());
            }
        }

        self.ctx
            .cooldowns
            .record_target_success(target, now, duration);

        if let Some(error) = self.persistence.save_logged() {
            warnings.push(format!("State could not be saved: {}", error));
        }

        info!(
            target_id = %target,
            votes,
            partial = !warnings.is_empty(),
            "Vote passed, {} locked up",
            self.nomination.target.display_name
        );
        VotingOutcome::Confined {
            until,
            votes,
            warnings,
        }
    }

    pub fn snapshot(&self) -> TallySnapshot {
        let phase = match self.outcome() {
            Some(outcome) => TallyPhase::Finished(outcome),
            None => TallyPhase::Open {
                early_finish_at: self.early_finish_at(),
            },
        };

        TallySnapshot {
            initiator_name: self.nomination.initiator.display_name.clone(),
            target_name: self.nomination.target.display_name.clone(),
            votes: self.tally.total(),
            required_votes: self.required_votes,
            duration: self.nomination.duration,
            deadline: self.deadline,
            phase,
        }
    }

    async fn render(&self) {
        self.view.render(&self.snapshot()).await;
    }
}

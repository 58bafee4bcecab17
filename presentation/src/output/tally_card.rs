//! Public tally card for a nomination.
//!
//! The card is a platform-neutral embed: a title, a description and an
//! ordered list of fields. Discord timestamps (`<t:epoch:R>`) render as
//! relative times in the client.

use chrono::{DateTime, Utc};
use kindergarten_domain::util::format_hours_minutes;
use kindergarten_domain::{TallyPhase, TallySnapshot, VotingOutcome};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

impl CardField {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyCard {
    pub title: String,
    pub description: String,
    pub fields: Vec<CardField>,
}

impl TallyCard {
    pub fn from_snapshot(snapshot: &TallySnapshot) -> Self {
        let mut fields = vec![CardField::new(
            "Duration",
            format_hours_minutes(snapshot.duration),
        )];

        match &snapshot.phase {
            TallyPhase::Open {
                early_finish_at: None,
            } => fields.push(CardField::new("Voting ends", relative(snapshot.deadline))),
            TallyPhase::Open {
                early_finish_at: Some(at),
            } => fields.push(CardField::new(
                "Voting ends",
                format!("{} (enough votes, closing early)", relative(*at)),
            )),
            TallyPhase::Finished(outcome) => {
                let verdict = if outcome.is_confined() {
                    "will be locked up"
                } else {
                    "will not be locked up"
                };
                fields.push(CardField::new(
                    "Voting has ended",
                    format!("{} {}", snapshot.target_name, verdict),
                ));

                if let VotingOutcome::Confined { warnings, .. } = outcome
                    && !warnings.is_empty()
                {
                    fields.push(CardField::new(
                        "An error has occurred! The user could not be locked up!",
                        warnings.join("\n"),
                    ));
                }
            }
        }

        Self {
            title: format!(
                "{} proposes to kindergarten {}",
                snapshot.initiator_name, snapshot.target_name
            ),
            description: format!("Votes: {}/{}", snapshot.votes, snapshot.required_votes),
            fields,
        }
    }

    /// Single-line rendering for logs
    pub fn to_plain_text(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.value.replace('\n', "; ")))
            .collect();
        format!("{} | {} | {}", self.title, self.description, fields.join(" | "))
    }
}

fn relative(at: DateTime<Utc>) -> String {
    format!("<t:{}:R>", at.timestamp())
}

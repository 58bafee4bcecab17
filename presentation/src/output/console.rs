//! Console output for the persisted state and the effective configuration

use chrono::{DateTime, Utc};
use colored::Colorize;
use kindergarten_application::BotConfig;
use kindergarten_domain::StateSnapshot;
use kindergarten_domain::util::format_hours_minutes;
use std::time::Duration;

/// Formats bot state and configuration for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the state document as seen at `now`
    pub fn format_state(snapshot: &StateSnapshot, now: DateTime<Utc>) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Kindergarten State"));
        output.push('\n');

        if snapshot.zones.is_empty() {
            output.push_str(&format!("\n{}\n", "No kindergartens configured.".dimmed()));
        }

        for zone in &snapshot.zones {
            output.push_str(&Self::section_header(&format!(
                "Community {}",
                zone.community_id
            )));
            output.push_str(&format!(
                "{} {}   {} {}   {} {}\n",
                "Channel:".cyan().bold(),
                zone.channel_id,
                "Role:".cyan().bold(),
                zone.role_id,
                "Votes needed:".cyan().bold(),
                zone.required_votes
            ));

            if zone.attendees.is_empty() {
                output.push_str(&format!("  {}\n", "no attendees".dimmed()));
            }
            for attendee in &zone.attendees {
                let remaining = attendee.end_time - now;
                let status = if remaining.num_seconds() <= 0 {
                    "expired, awaiting release".yellow().to_string()
                } else {
                    format!("{} left", format_hours_minutes(remaining))
                };
                output.push_str(&format!(
                    "  * {} until {} ({})\n",
                    attendee.user_id.to_string().bold(),
                    attendee.end_time.format("%Y-%m-%d %H:%M UTC"),
                    status
                ));
            }
        }

        let active: Vec<_> = snapshot
            .target_cooldowns
            .iter()
            .filter(|(_, until)| **until > now)
            .collect();
        output.push_str(&Self::section_header("Target cooldowns"));
        if active.is_empty() {
            output.push_str(&format!("  {}\n", "none active".dimmed()));
        }
        for (user, until) in &active {
            output.push_str(&format!(
                "  * {} protected for {}\n",
                user,
                format_hours_minutes(**until - now)
            ));
        }
        let lapsed = snapshot.target_cooldowns.len() - active.len();
        if lapsed > 0 {
            output.push_str(&format!("  {}\n", format!("({} lapsed)", lapsed).dimmed()));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format the state document as JSON
    pub fn format_state_json(snapshot: &StateSnapshot) -> String {
        serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line of the configuration source listing
    pub fn config_source(label: &str, location: &str, found: bool) -> String {
        let marker = if found {
            "[FOUND]".green().to_string()
        } else {
            "[     ]".dimmed().to_string()
        };
        format!("  {} {:<9}{}", marker, format!("{}:", label), location)
    }

    /// Format the effective bot configuration
    pub fn format_bot_config(config: &BotConfig) -> String {
        let rows = [
            ("Voting window", secs(config.voting_window)),
            ("Early-finish grace", secs(config.early_finish_grace)),
            ("Channel cooldown", secs(config.channel_cooldown)),
            ("Initiator cooldown", secs(config.initiator_cooldown)),
            ("Target cooldown (failed)", secs(config.target_failure_cooldown)),
            ("Buffer after confinement", secs(config.success_buffer)),
            ("Expiry loop", secs(config.expiry_interval)),
            ("Permission sync loop", secs(config.permission_sync_interval)),
            ("Prune loop", secs(config.prune_interval)),
            (
                "Durations (min)",
                config
                    .duration_choices
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            ("Exempt users", config.exempt_users.len().to_string()),
            ("Role name", config.role_name.clone()),
        ];

        let mut output = format!("{}\n", "Effective configuration:".cyan().bold());
        for (name, value) in rows {
            output.push_str(&format!("  {:<26}{}\n", name, value));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

fn secs(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

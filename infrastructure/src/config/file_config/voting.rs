//! Voting configuration from TOML (`[voting]` section)

use kindergarten_application::config::DEFAULT_DURATION_CHOICES;
use serde::{Deserialize, Serialize};

/// Raw voting configuration from TOML
///
/// # Example
///
/// ```toml
/// [voting]
/// window_secs = 420
/// early_finish_grace_secs = 60
/// duration_choices = [10, 30, 60]
/// role_name = "Kindergarten Attendee"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVotingConfig {
    /// How long a nomination stays open
    pub window_secs: u64,
    /// How long the threshold must hold before a vote closes early
    pub early_finish_grace_secs: u64,
    /// Confinement lengths (minutes) members may choose from
    pub duration_choices: Vec<u32>,
    /// Name of the confinement role looked up or created during setup
    pub role_name: String,
}

impl Default for FileVotingConfig {
    fn default() -> Self {
        Self {
            window_secs: 7 * 60,
            early_finish_grace_secs: 60,
            duration_choices: DEFAULT_DURATION_CHOICES.to_vec(),
            role_name: "Kindergarten Attendee".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_voting_section_partial() {
        let toml_str = r#"
[voting]
window_secs = 300
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.voting.window_secs, 300);
        assert_eq!(config.voting.early_finish_grace_secs, 60);
        assert_eq!(config.voting.duration_choices.len(), 10);
    }
}

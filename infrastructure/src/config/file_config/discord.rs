//! Discord connection configuration from TOML (`[discord]` section)

use kindergarten_domain::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Raw Discord configuration from TOML.
///
/// The token is normally supplied through `DISCORD_TOKEN` or
/// `KINDERGARTEN_DISCORD__TOKEN` rather than written to a file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscordConfig {
    pub token: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
    /// Users that can never be nominated and may use the admin override
    pub exempt_users: Vec<UserId>,
}

impl Default for FileDiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            exempt_users: Vec::new(),
        }
    }
}

impl fmt::Debug for FileDiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("exempt_users", &self.exempt_users)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let config = FileDiscordConfig {
            token: Some("secret-token".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_exempt_users_accept_strings_and_numbers() {
        let toml_str = r#"
[discord]
exempt_users = ["502871063223336990", 7]
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.discord.exempt_users,
            vec![UserId::new(502871063223336990), UserId::new(7)]
        );
    }
}

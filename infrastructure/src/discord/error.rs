//! Error types for the Discord adapter

use kindergarten_application::ports::platform::PlatformError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Discord REST operations
pub type Result<T> = std::result::Result<T, DiscordError>;

/// Errors that can occur when talking to the Discord REST API
#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing access: {0}")]
    Forbidden(String),

    #[error("Unknown resource: {0}")]
    NotFound(String),

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Discord returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("No bot token configured")]
    MissingToken,
}

impl From<DiscordError> for PlatformError {
    fn from(error: DiscordError) -> Self {
        match error {
            DiscordError::Forbidden(message) => PlatformError::Forbidden(message),
            DiscordError::NotFound(message) => PlatformError::NotFound(message),
            DiscordError::RateLimited { retry_after } => PlatformError::RateLimited { retry_after },
            DiscordError::Http(e) if e.is_decode() => PlatformError::Decode(e.to_string()),
            DiscordError::Http(e) => PlatformError::Transport(e.to_string()),
            DiscordError::Decode(message) => PlatformError::Decode(message),
            other @ (DiscordError::Status { .. } | DiscordError::MissingToken) => {
                PlatformError::Other(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_signals_survive_conversion() {
        let forbidden: PlatformError = DiscordError::Forbidden("Missing Access".into()).into();
        assert!(forbidden.is_deletion_signal());

        let missing: PlatformError = DiscordError::NotFound("Unknown Channel".into()).into();
        assert!(missing.is_deletion_signal());

        let server: PlatformError = DiscordError::Status {
            status: 502,
            message: "Bad Gateway".into(),
        }
        .into();
        assert!(!server.is_deletion_signal());
        assert!(matches!(server, PlatformError::Other(_)));

        let limited: PlatformError = DiscordError::RateLimited {
            retry_after: Some(Duration::from_millis(1500)),
        }
        .into();
        assert_eq!(
            limited,
            PlatformError::RateLimited {
                retry_after: Some(Duration::from_millis(1500))
            }
        );
    }
}

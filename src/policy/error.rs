//! Error types for moderation workflows

use poise::serenity_prelude as serenity;
use thiserror::Error;

/// Errors that can occur while scanning, banning or purging
#[derive(Debug, Error)]
pub enum PurgeError {
    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<serenity::Error>),

    /// The membership list could not be fetched
    #[error("Failed to fetch members of guild {guild_id}: {reason}")]
    MemberFetch { guild_id: u64, reason: String },

    /// The invoker lacks a permission the command needs
    #[error("You lack `{0}` permission")]
    MissingPermission(&'static str),

    /// A purge amount outside 1..=100
    #[error("Amount must be between 1 and 100, got {0}")]
    AmountOutOfRange(i64),
}

impl From<serenity::Error> for PurgeError {
    fn from(error: serenity::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

/// Result type for moderation operations
pub type PurgeResult<T> = Result<T, PurgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PurgeError::AmountOutOfRange(101);
        assert_eq!(error.to_string(), "Amount must be between 1 and 100, got 101");

        let error = PurgeError::MemberFetch {
            guild_id: 42,
            reason: "timeout".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to fetch members of guild 42: timeout"
        );

        let error = PurgeError::from(serenity::Error::Other("Missing Permissions"));
        assert!(matches!(error, PurgeError::DiscordApi(_)));
        assert!(error.to_string().starts_with("Discord API error: "));
    }
}

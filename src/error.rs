// Error taxonomy shared by the dispatch pipeline and command handlers

use chrono::{DateTime, Utc};

use crate::models::guild::KEY_ALIASES;
use crate::utils::config::{GENERIC_FAILURE, MAX_PREFIX_LEN};
use crate::utils::formatters::relative_timestamp;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("`{0}` is not a configuration key")]
    InvalidKey(String),

    #[error("`{0}` does not name a configuration key")]
    UnknownConfigKey(String),

    #[error("`{0}` is not a channel mention or ID")]
    InvalidChannelReference(String),

    #[error("channel {0} not found or not text-based")]
    ChannelNotFound(String),

    #[error("prefix is {len} characters, at most {} allowed", MAX_PREFIX_LEN)]
    PrefixTooLong { len: usize },

    #[error("requester lacks the Manage Server permission")]
    PermissionDenied,

    #[error("`{command}` is on cooldown until {retry_at}")]
    RateLimited {
        command: String,
        retry_at: DateTime<Utc>,
    },

    #[error("upstream fetch failed: {0}")]
    UpstreamFetchFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl BotError {
    /// Text safe to show to the person who triggered the error
    pub fn user_message(&self) -> String {
        match self {
            BotError::InvalidKey(_) => "Invalid configuration key.".to_string(),
            BotError::UnknownConfigKey(key) => format!(
                "Invalid configuration key: `{}`\n\nValid keys: `{}`",
                key,
                KEY_ALIASES
                    .iter()
                    .map(|(alias, _)| *alias)
                    .collect::<Vec<_>>()
                    .join("`, `")
            ),
            BotError::InvalidChannelReference(_) => {
                "Please provide a valid channel mention or ID.".to_string()
            }
            BotError::ChannelNotFound(_) => {
                "Channel not found or is not a text channel.".to_string()
            }
            BotError::PrefixTooLong { .. } => format!(
                "Prefix cannot be longer than {} characters.",
                MAX_PREFIX_LEN
            ),
            BotError::PermissionDenied => {
                "You need the \"Manage Server\" permission to use this command.".to_string()
            }
            BotError::RateLimited { command, retry_at } => format!(
                "Please wait, you are on a cooldown for `{}`. You can use it again {}.",
                command,
                relative_timestamp(*retry_at)
            ),
            BotError::UpstreamFetchFailed(_)
            | BotError::Config(_)
            | BotError::Database(_)
            | BotError::Unhandled(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Whether this is a validation problem the requester can fix themselves
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BotError::InvalidKey(_)
                | BotError::UnknownConfigKey(_)
                | BotError::InvalidChannelReference(_)
                | BotError::ChannelNotFound(_)
                | BotError::PrefixTooLong { .. }
                | BotError::PermissionDenied
                | BotError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = BotError::Unhandled(anyhow::anyhow!("connection refused at 10.0.0.3"));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert!(!err.is_user_error());

        let err = BotError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = BotError::UpstreamFetchFailed("timeout".into());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_rate_limited_message() {
        let retry_at = Utc.timestamp_opt(1_700_000_003, 0).unwrap();
        let err = BotError::RateLimited {
            command: "config".into(),
            retry_at,
        };
        assert_eq!(
            err.user_message(),
            "Please wait, you are on a cooldown for `config`. You can use it again <t:1700000003:R>."
        );
        assert!(err.is_user_error());
    }

    #[test]
    fn test_unknown_key_lists_aliases() {
        let msg = BotError::UnknownConfigKey("nope".into()).user_message();
        assert!(msg.starts_with("Invalid configuration key: `nope`"));
        assert!(msg.contains("`warn`"));
        assert!(msg.contains("`purge_log`"));
    }

    #[test]
    fn test_prefix_too_long_message() {
        let msg = BotError::PrefixTooLong { len: 6 }.user_message();
        assert_eq!(msg, "Prefix cannot be longer than 5 characters.");
    }
}

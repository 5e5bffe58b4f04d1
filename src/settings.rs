// Startup settings read from the environment

use std::time::Duration;

use poise::serenity_prelude as serenity;

use crate::error::BotError;
use crate::utils::config::DEFAULT_MEMBER_FETCH_TIMEOUT;

const DEFAULT_DATABASE_URL: &str = "sqlite:guild_config.db";

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    /// Register slash commands to this guild only (fast iteration while developing)
    pub guild_id: Option<serenity::GuildId>,
    pub member_fetch_timeout: Duration,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Required:
    /// - `DISCORD_TOKEN`
    ///
    /// Optional:
    /// - `DATABASE_URL` (default `sqlite:guild_config.db`)
    /// - `GUILD_ID`
    /// - `MEMBER_FETCH_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BotError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| BotError::Config("DISCORD_TOKEN environment variable is required".into()))?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let guild_id = parse_optional_id("GUILD_ID", lookup("GUILD_ID"))?.map(serenity::GuildId::new);

        let member_fetch_timeout = match parse_optional_id("MEMBER_FETCH_TIMEOUT_SECS", lookup("MEMBER_FETCH_TIMEOUT_SECS"))? {
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_MEMBER_FETCH_TIMEOUT,
        };

        Ok(Self {
            discord_token,
            database_url,
            guild_id,
            member_fetch_timeout,
        })
    }
}

/// Positive integer from an optional variable; empty counts as unset
fn parse_optional_id(var: &str, value: Option<String>) -> Result<Option<u64>, BotError> {
    match value {
        Some(val) if !val.trim().is_empty() => match val.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(BotError::Config(format!("Invalid value for {var}: '{val}'"))),
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, BotError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(settings.discord_token, "abc");
        assert_eq!(settings.database_url, "sqlite:guild_config.db");
        assert_eq!(settings.guild_id, None);
        assert_eq!(settings.member_fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_token_required() {
        assert!(matches!(load(&[]), Err(BotError::Config(_))));
        assert!(matches!(load(&[("DISCORD_TOKEN", "  ")]), Err(BotError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let settings = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("GUILD_ID", "123456789"),
            ("MEMBER_FETCH_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.guild_id, Some(serenity::GuildId::new(123456789)));
        assert_eq!(settings.member_fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_optional_id() {
        assert_eq!(parse_optional_id("X", None).unwrap(), None);
        assert_eq!(parse_optional_id("X", Some(String::new())).unwrap(), None);
        assert_eq!(parse_optional_id("X", Some(" 42 ".into())).unwrap(), Some(42));
        assert!(parse_optional_id("X", Some("0".into())).is_err());
        assert!(parse_optional_id("X", Some("abc".into())).is_err());
        assert!(parse_optional_id("X", Some("-1".into())).is_err());
    }
}

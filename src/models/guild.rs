use crate::error::BotError;
use crate::utils::config::DEFAULT_PREFIX;

/// The seven settings a server can configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum ConfigKey {
    #[name = "Prefix"]
    Prefix,
    #[name = "Warning Log Channel"]
    WarnLogChannel,
    #[name = "Kick Log Channel"]
    KickLogChannel,
    #[name = "Ban Log Channel"]
    BanLogChannel,
    #[name = "Mute Log Channel"]
    MuteLogChannel,
    #[name = "Lockdown Log Channel"]
    LockdownLogChannel,
    #[name = "Purge Log Channel"]
    PurgeLogChannel,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 7] = [
        ConfigKey::Prefix,
        ConfigKey::WarnLogChannel,
        ConfigKey::KickLogChannel,
        ConfigKey::BanLogChannel,
        ConfigKey::MuteLogChannel,
        ConfigKey::LockdownLogChannel,
        ConfigKey::PurgeLogChannel,
    ];

    /// Column name in `guild_config`, also the canonical key name
    pub fn column(self) -> &'static str {
        match self {
            ConfigKey::Prefix => "prefix",
            ConfigKey::WarnLogChannel => "warn_log_channel_id",
            ConfigKey::KickLogChannel => "kick_log_channel_id",
            ConfigKey::BanLogChannel => "ban_log_channel_id",
            ConfigKey::MuteLogChannel => "mute_log_channel_id",
            ConfigKey::LockdownLogChannel => "lockdown_log_channel_id",
            ConfigKey::PurgeLogChannel => "purge_log_channel_id",
        }
    }

    /// Embed field label
    pub fn label(self) -> &'static str {
        match self {
            ConfigKey::Prefix => "❓ Prefix",
            ConfigKey::WarnLogChannel => "⚠️ Warn Log Channel",
            ConfigKey::KickLogChannel => "🥾 Kick Log Channel",
            ConfigKey::BanLogChannel => "🛑 Ban Log Channel",
            ConfigKey::MuteLogChannel => "🔇 Mute Log Channel",
            ConfigKey::LockdownLogChannel => "🔒 Lockdown Log Channel",
            ConfigKey::PurgeLogChannel => "🗡️ Purge Log Channel",
        }
    }

    pub fn is_channel(self) -> bool {
        self != ConfigKey::Prefix
    }

    /// Look up a canonical key name (no aliases)
    pub fn from_column(name: &str) -> Option<ConfigKey> {
        ConfigKey::ALL.into_iter().find(|key| key.column() == name)
    }
}

/// Short names accepted by the text surface, in the order they are listed to users
pub const KEY_ALIASES: [(&str, ConfigKey); 14] = [
    ("prefix", ConfigKey::Prefix),
    ("warn", ConfigKey::WarnLogChannel),
    ("warning", ConfigKey::WarnLogChannel),
    ("warn_log", ConfigKey::WarnLogChannel),
    ("kick", ConfigKey::KickLogChannel),
    ("kick_log", ConfigKey::KickLogChannel),
    ("ban", ConfigKey::BanLogChannel),
    ("ban_log", ConfigKey::BanLogChannel),
    ("mute", ConfigKey::MuteLogChannel),
    ("mute_log", ConfigKey::MuteLogChannel),
    ("lockdown", ConfigKey::LockdownLogChannel),
    ("lockdown_log", ConfigKey::LockdownLogChannel),
    ("purge", ConfigKey::PurgeLogChannel),
    ("purge_log", ConfigKey::PurgeLogChannel),
];

/// Resolve a user-typed key (alias or canonical name, any case)
pub fn resolve_alias(input: &str) -> Result<ConfigKey, BotError> {
    let lowered = input.to_lowercase();
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, key)| *key)
        .or_else(|| ConfigKey::from_column(&lowered))
        .ok_or_else(|| BotError::UnknownConfigKey(input.to_string()))
}

/// Guild (Server) specific configuration, one row of `guild_config`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GuildConfig {
    pub guild_id: String,
    pub prefix: String,
    pub warn_log_channel_id: Option<String>,
    pub kick_log_channel_id: Option<String>,
    pub ban_log_channel_id: Option<String>,
    pub mute_log_channel_id: Option<String>,
    pub lockdown_log_channel_id: Option<String>,
    pub purge_log_channel_id: Option<String>,
}

impl GuildConfig {
    /// What an unconfigured server looks like
    pub fn defaults(guild_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            warn_log_channel_id: None,
            kick_log_channel_id: None,
            ban_log_channel_id: None,
            mute_log_channel_id: None,
            lockdown_log_channel_id: None,
            purge_log_channel_id: None,
        }
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::Prefix => Some(self.prefix.as_str()),
            ConfigKey::WarnLogChannel => self.warn_log_channel_id.as_deref(),
            ConfigKey::KickLogChannel => self.kick_log_channel_id.as_deref(),
            ConfigKey::BanLogChannel => self.ban_log_channel_id.as_deref(),
            ConfigKey::MuteLogChannel => self.mute_log_channel_id.as_deref(),
            ConfigKey::LockdownLogChannel => self.lockdown_log_channel_id.as_deref(),
            ConfigKey::PurgeLogChannel => self.purge_log_channel_id.as_deref(),
        }
    }

    /// Overlay a single field, leaving the rest untouched
    pub fn set(&mut self, key: ConfigKey, value: String) {
        match key {
            ConfigKey::Prefix => self.prefix = value,
            ConfigKey::WarnLogChannel => self.warn_log_channel_id = Some(value),
            ConfigKey::KickLogChannel => self.kick_log_channel_id = Some(value),
            ConfigKey::BanLogChannel => self.ban_log_channel_id = Some(value),
            ConfigKey::MuteLogChannel => self.mute_log_channel_id = Some(value),
            ConfigKey::LockdownLogChannel => self.lockdown_log_channel_id = Some(value),
            ConfigKey::PurgeLogChannel => self.purge_log_channel_id = Some(value),
        }
    }
}

// Guild configuration store
// One row per server in a single SQLite table

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::BotError;
use crate::models::guild::{ConfigKey, GuildConfig};
use crate::utils::config::MAX_PREFIX_LEN;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS guild_config (
    guild_id TEXT PRIMARY KEY,
    prefix TEXT DEFAULT ',',
    warn_log_channel_id TEXT,
    kick_log_channel_id TEXT,
    ban_log_channel_id TEXT,
    mute_log_channel_id TEXT,
    lockdown_log_channel_id TEXT,
    purge_log_channel_id TEXT
)";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_guild_config_guild_id ON guild_config(guild_id)";

const SELECT_CONFIG: &str = "SELECT guild_id, prefix,
    warn_log_channel_id, kick_log_channel_id, ban_log_channel_id,
    mute_log_channel_id, lockdown_log_channel_id, purge_log_channel_id
    FROM guild_config WHERE guild_id = ?";

const UPSERT_CONFIG: &str = "INSERT OR REPLACE INTO guild_config
    (guild_id, prefix, warn_log_channel_id, kick_log_channel_id, ban_log_channel_id,
     mute_log_channel_id, lockdown_log_channel_id, purge_log_channel_id)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const DELETE_CONFIG: &str = "DELETE FROM guild_config WHERE guild_id = ?";

/// Owns the `guild_config` table. Handlers only ever see `GuildConfig` values.
///
/// Writes are read-modify-write over the whole row. Two concurrent `set`
/// calls for the same server can lose one of the updates; each individual
/// upsert is still atomic.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pool: SqlitePool,
    /// guild id -> prefix, filled on first lookup and kept in step by `set`/`reset`
    prefixes: Arc<DashMap<String, String>>,
}

impl ConfigStore {
    /// Open (creating if missing) the database at `database_url` and ensure the schema
    pub async fn connect(database_url: &str) -> Result<Self, BotError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool).await?;
        info!("Guild config store ready at {}", database_url);
        Ok(store)
    }

    /// Wrap an existing pool, creating the table and index if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, BotError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_INDEX).execute(&pool).await?;
        Ok(Self {
            pool,
            prefixes: Arc::new(DashMap::new()),
        })
    }

    /// Stored configuration, or defaults when the server never set anything
    pub async fn get(&self, guild_id: &str) -> Result<GuildConfig, BotError> {
        let row = sqlx::query_as::<_, GuildConfig>(SELECT_CONFIG)
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.unwrap_or_else(|| GuildConfig::defaults(guild_id)))
    }

    /// The server's command prefix, served from memory after the first read
    pub async fn prefix(&self, guild_id: &str) -> Result<String, BotError> {
        if let Some(prefix) = self.prefixes.get(guild_id) {
            return Ok(prefix.clone());
        }

        let prefix = self.get(guild_id).await?.prefix;
        self.prefixes.insert(guild_id.to_string(), prefix.clone());
        Ok(prefix)
    }

    /// Set a value by canonical key name
    pub async fn set_value(&self, guild_id: &str, key: &str, value: &str) -> Result<(), BotError> {
        let key = ConfigKey::from_column(key).ok_or_else(|| BotError::InvalidKey(key.to_string()))?;
        self.set(guild_id, key, value).await
    }

    /// Overlay one field on the current configuration and upsert the whole row
    pub async fn set(&self, guild_id: &str, key: ConfigKey, value: &str) -> Result<(), BotError> {
        if key == ConfigKey::Prefix {
            let len = value.chars().count();
            if len > MAX_PREFIX_LEN {
                return Err(BotError::PrefixTooLong { len });
            }
        }

        let mut config = self.get(guild_id).await?;
        config.set(key, value.to_string());

        sqlx::query(UPSERT_CONFIG)
            .bind(&config.guild_id)
            .bind(&config.prefix)
            .bind(&config.warn_log_channel_id)
            .bind(&config.kick_log_channel_id)
            .bind(&config.ban_log_channel_id)
            .bind(&config.mute_log_channel_id)
            .bind(&config.lockdown_log_channel_id)
            .bind(&config.purge_log_channel_id)
            .execute(&self.pool)
            .await?;

        if key == ConfigKey::Prefix {
            self.prefixes.insert(config.guild_id.clone(), config.prefix.clone());
        }

        debug!("Guild {} set {} = {}", guild_id, key.column(), value);
        Ok(())
    }

    /// Drop the row so every field falls back to its default. No-op if absent.
    pub async fn reset(&self, guild_id: &str) -> Result<(), BotError> {
        let result = sqlx::query(DELETE_CONFIG)
            .bind(guild_id)
            .execute(&self.pool)
            .await?;

        self.prefixes.remove(guild_id);

        debug!("Guild {} reset ({} row(s) removed)", guild_id, result.rows_affected());
        Ok(())
    }

    /// Fresh store backed by a private in-memory database
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Self::from_pool(pool).await.unwrap()
    }

    #[cfg(test)]
    async fn row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM guild_config")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

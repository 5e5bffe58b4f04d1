use poise::serenity_prelude as serenity;
use tracing::info;

use crate::discord::slash;
use crate::dispatch::registry::HandlerFuture;
use crate::dispatch::{CommandDefinition, GuildIdentity, Invocation, Reply, Surface};
use crate::error::BotError;
use crate::models::guild::{resolve_alias, ConfigKey, GuildConfig};
use crate::utils::config::{colors, MAX_ECHOED_VALUE_LEN};
use crate::utils::formatters::{channel_mention, truncate};
use crate::{Context, Data, Error};

const GUILD_ONLY: &str = "This command can only be used in a server.";
const MISSING_KEY: &str = "Please provide a configuration key to set.\n\nValid keys: `prefix`, `warn`, `kick`, `ban`, `mute`, `lockdown`, `purge`";
const MISSING_VALUE: &str = "Please provide a value to set for this configuration key.";
const MISSING_KEY_OR_VALUE: &str = "Please provide both a key and value to set.";
const INVALID_SUBCOMMAND: &str = "Invalid subcommand. Use `view`, `set`, or `reset`.";

pub fn definition() -> CommandDefinition {
    CommandDefinition::new("config", run).text_enabled()
}

fn run<'a>(data: &'a Data, surface: &'a dyn Surface, invocation: &'a Invocation) -> HandlerFuture<'a> {
    Box::pin(execute(data, surface, invocation))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    View,
    Set { key: ConfigKey, value: String },
    Reset,
}

/// Either something to do, or a prompt telling the user what's missing
#[derive(Debug, Clone, PartialEq, Eq)]
enum Parsed {
    Run(Request),
    Prompt(String),
}

async fn execute(data: &Data, surface: &dyn Surface, invocation: &Invocation) -> anyhow::Result<()> {
    let Some(guild) = surface.guild() else {
        return surface.reply(Reply::Private(GUILD_ONLY.to_string())).await;
    };

    if !surface.can_manage_guild() {
        return surface
            .reply(Reply::Private(BotError::PermissionDenied.user_message()))
            .await;
    }

    let request = match parse(data, guild, invocation).await? {
        Parsed::Run(request) => request,
        Parsed::Prompt(prompt) => return surface.reply(Reply::Private(prompt)).await,
    };

    match request {
        Request::View => view_config(data, surface, guild).await,
        Request::Set { key, value } => set_config(data, surface, guild, key, &value).await,
        Request::Reset => reset_config(data, surface, guild).await,
    }
}

async fn parse(data: &Data, guild: &GuildIdentity, invocation: &Invocation) -> anyhow::Result<Parsed> {
    match invocation {
        Invocation::Textual { args, .. } => {
            let Some(subcommand) = args.first() else {
                let prefix = data.store.get(&guild.id).await?.prefix;
                return Ok(Parsed::Prompt(format!(
                    "Usage: `{}config <view|set|reset> [key] [value]`",
                    prefix
                )));
            };
            Ok(parse_text(&subcommand.to_lowercase(), &args[1..]))
        }
        Invocation::Structured { subcommand, .. } => {
            Ok(parse_structured(subcommand.as_deref().unwrap_or_default(), invocation))
        }
    }
}

fn parse_text(subcommand: &str, rest: &[String]) -> Parsed {
    match subcommand {
        "view" => Parsed::Run(Request::View),
        "reset" => Parsed::Run(Request::Reset),
        "set" => {
            let Some(raw_key) = rest.first() else {
                return Parsed::Prompt(MISSING_KEY.to_string());
            };
            let key = match resolve_alias(raw_key) {
                Ok(key) => key,
                Err(e) => return Parsed::Prompt(e.user_message()),
            };
            let value = rest[1..].join(" ");
            if value.is_empty() {
                return Parsed::Prompt(MISSING_VALUE.to_string());
            }
            Parsed::Run(Request::Set { key, value })
        }
        _ => Parsed::Prompt(INVALID_SUBCOMMAND.to_string()),
    }
}

fn parse_structured(subcommand: &str, invocation: &Invocation) -> Parsed {
    match subcommand {
        "view" => Parsed::Run(Request::View),
        "reset" => Parsed::Run(Request::Reset),
        "set" => {
            let (Some(key), Some(value)) = (invocation.option("key"), invocation.option("value")) else {
                return Parsed::Prompt(MISSING_KEY_OR_VALUE.to_string());
            };
            match ConfigKey::from_column(key) {
                Some(key) => Parsed::Run(Request::Set {
                    key,
                    value: value.to_string(),
                }),
                None => Parsed::Prompt(BotError::InvalidKey(key.to_string()).user_message()),
            }
        }
        _ => Parsed::Prompt(INVALID_SUBCOMMAND.to_string()),
    }
}

/// Accepts `<#123>` or `123`; returns the channel id
pub fn parse_channel_reference(value: &str) -> Result<u64, BotError> {
    let digits = value
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(value);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BotError::InvalidChannelReference(value.to_string()));
    }

    // All digits but not a usable snowflake
    match digits.parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(BotError::ChannelNotFound(digits.to_string())),
    }
}

async fn view_config(data: &Data, surface: &dyn Surface, guild: &GuildIdentity) -> anyhow::Result<()> {
    let config = data.store.get(&guild.id).await?;
    surface.reply(Reply::Embed(view_embed(guild, &config))).await
}

fn view_embed(guild: &GuildIdentity, config: &GuildConfig) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("⚙️ Server Configuration - {}", guild.name))
        .color(colors::CONFIG)
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(format!("Server ID: {}", guild.id)));

    if let Some(icon) = &guild.icon_url {
        embed = embed.thumbnail(icon);
    }

    for key in ConfigKey::ALL {
        let value = match (key, config.get(key)) {
            (ConfigKey::Prefix, Some(prefix)) => format!("`{}`", prefix),
            (_, Some(channel_id)) => channel_mention(channel_id),
            (_, None) => format!("`Not set ({})`", key.column()),
        };
        embed = embed.field(key.label(), value, true);
    }

    embed
}

async fn set_config(
    data: &Data,
    surface: &dyn Surface,
    guild: &GuildIdentity,
    key: ConfigKey,
    value: &str,
) -> anyhow::Result<()> {
    let stored = if key.is_channel() {
        let channel_id = match parse_channel_reference(value) {
            Ok(id) => id,
            Err(e) => return surface.reply(Reply::Private(e.user_message())).await,
        };
        if !surface.is_text_channel(channel_id).await {
            let e = BotError::ChannelNotFound(channel_id.to_string());
            return surface.reply(Reply::Private(e.user_message())).await;
        }
        channel_id.to_string()
    } else {
        value.to_string()
    };

    match data.store.set(&guild.id, key, &stored).await {
        Ok(()) => {}
        Err(e) if e.is_user_error() => return surface.reply(Reply::Private(e.user_message())).await,
        Err(e) => return Err(e.into()),
    }

    info!(
        guild = %guild.id,
        user = surface.author().id,
        "Config {} set to {}",
        key.column(),
        stored
    );

    let embed = serenity::CreateEmbed::new()
        .title(format!("✅ Configuration Updated - {}", guild.name))
        .color(colors::SUCCESS)
        .field("Key", format!("`{}`", key.column()), true)
        .field("New Value", format!("`{}`", truncate(&stored, MAX_ECHOED_VALUE_LEN)), true)
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Updated by {}",
            surface.author().name
        )));

    surface.reply(Reply::Embed(embed)).await
}

async fn reset_config(data: &Data, surface: &dyn Surface, guild: &GuildIdentity) -> anyhow::Result<()> {
    data.store.reset(&guild.id).await?;
    info!(guild = %guild.id, user = surface.author().id, "Config reset");

    let embed = serenity::CreateEmbed::new()
        .title(format!("🔄 Configuration Reset - {}", guild.name))
        .description("All server configuration has been reset to default values.")
        .color(colors::RESET)
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Reset by {}",
            surface.author().name
        )));

    surface.reply(Reply::Embed(embed)).await
}

/// View or modify your server configuration
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD",
    subcommands("view", "set", "reset"),
    subcommand_required
)]
pub async fn config(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// View your current server configuration
#[poise::command(slash_command, guild_only)]
pub async fn view(ctx: Context<'_>) -> Result<(), Error> {
    slash::dispatch(ctx, "config", Invocation::structured(Some("view"), vec![])).await
}

/// Set a configuration value
#[poise::command(slash_command, guild_only)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Configuration key to set"] key: ConfigKey,
    #[description = "New value for this configuration"] value: String,
) -> Result<(), Error> {
    let invocation = Invocation::structured(
        Some("set"),
        vec![("key", key.column().to_string()), ("value", value)],
    );
    slash::dispatch(ctx, "config", invocation).await
}

/// Reset server configuration to defaults
#[poise::command(slash_command, guild_only)]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    slash::dispatch(ctx, "config", Invocation::structured(Some("reset"), vec![])).await
}

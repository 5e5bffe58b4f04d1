// Guild introspection backed by the gateway cache and HTTP API

use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::error::BotError;
use crate::features::member_counts::MemberSplit;
use crate::models::server::{ChannelCounts, GuildSummary};

/// Largest page the member list endpoint serves
const MEMBER_PAGE_SIZE: u64 = 1000;

/// Snapshot everything `/serverinfo` needs.
///
/// Cache data is copied out before any HTTP call so no cache lock is held
/// across an await.
pub async fn summarize(ctx: &serenity::Context, guild_id: serenity::GuildId) -> anyhow::Result<GuildSummary> {
    let (mut summary, owner_id, cached_owner) = {
        let guild = guild_id
            .to_guild_cached(&ctx.cache)
            .ok_or_else(|| anyhow::anyhow!("guild {} is not in the cache", guild_id))?;

        let cached_owner = guild.members.get(&guild.owner_id).map(|m| m.user.name.clone());
        (snapshot(&guild), guild.owner_id, cached_owner)
    };

    let owner_name = match cached_owner {
        Some(name) => Some(name),
        None => match owner_id.to_user(ctx).await {
            Ok(user) => Some(user.name),
            Err(e) => {
                warn!("Failed to fetch owner {} of guild {}: {:?}", owner_id, guild_id, e);
                None
            }
        },
    };

    summary.owner = match owner_name {
        Some(name) => format!("{} ({})", name, owner_id),
        None => format!("<@{}>", owner_id),
    };
    Ok(summary)
}

fn snapshot(guild: &serenity::Guild) -> GuildSummary {
    let everyone = serenity::RoleId::new(guild.id.get());
    let everyone_base = guild
        .roles
        .get(&everyone)
        .map(|role| role.permissions)
        .unwrap_or_else(serenity::Permissions::empty);

    let created = guild.id.created_at().unix_timestamp();

    GuildSummary {
        id: guild.id.to_string(),
        name: guild.name.clone(),
        icon_url: guild.icon_url(),
        banner_url: guild.banner_url(),
        owner: String::new(),
        created: chrono::DateTime::from_timestamp(created, 0)
            .map(|at| at.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
        member_count: guild.member_count,
        role_count: guild.roles.len(),
        channels: count_channels(guild.channels.values(), everyone, everyone_base),
        boost_level: u8::from(guild.premium_tier),
        boost_count: guild.premium_subscription_count.unwrap_or(0),
        verification_level: format!("{:?}", guild.verification_level),
        has_invite_splash: guild.splash.is_some(),
        has_animated_icon: guild.icon.as_ref().is_some_and(|hash| hash.is_animated()),
    }
}

fn count_channels<'a>(
    channels: impl Iterator<Item = &'a serenity::GuildChannel>,
    everyone: serenity::RoleId,
    everyone_base: serenity::Permissions,
) -> ChannelCounts {
    let mut counts = ChannelCounts::default();

    for channel in channels {
        counts.total += 1;
        let locked = is_hidden_from_everyone(everyone_base, &channel.permission_overwrites, everyone);
        match channel.kind {
            serenity::ChannelType::Text => {
                counts.text += 1;
                counts.locked_text += usize::from(locked);
            }
            serenity::ChannelType::Voice => {
                counts.voice += 1;
                counts.locked_voice += usize::from(locked);
            }
            serenity::ChannelType::News => counts.news += 1,
            _ => {}
        }
    }

    counts
}

/// Whether @everyone lacks View Channel after the channel's role overwrite
pub fn is_hidden_from_everyone(
    base: serenity::Permissions,
    overwrites: &[serenity::PermissionOverwrite],
    everyone: serenity::RoleId,
) -> bool {
    let effective = overwrites
        .iter()
        .filter(|overwrite| overwrite.kind == serenity::PermissionOverwriteType::Role(everyone))
        .fold(base, |perms, overwrite| (perms & !overwrite.deny) | overwrite.allow);

    !effective.contains(serenity::Permissions::VIEW_CHANNEL)
}

/// Channels a log message can be posted in
pub fn is_text_kind(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text
            | serenity::ChannelType::News
            | serenity::ChannelType::Voice
            | serenity::ChannelType::Stage
            | serenity::ChannelType::PublicThread
            | serenity::ChannelType::PrivateThread
            | serenity::ChannelType::NewsThread
    )
}

/// Whether `channel_id` is a cached text-capable channel or active thread of `guild_id`
pub fn is_text_channel(cache: &serenity::Cache, guild_id: serenity::GuildId, channel_id: u64) -> bool {
    let channel_id = serenity::ChannelId::new(channel_id);
    let Some(guild) = guild_id.to_guild_cached(cache) else {
        return false;
    };

    let kind = guild
        .channels
        .get(&channel_id)
        .or_else(|| guild.threads.iter().find(|thread| thread.id == channel_id))
        .map(|channel| channel.kind);

    kind.is_some_and(is_text_kind)
}

/// Whether any of `roles` (including @everyone) grants Manage Server or Administrator
pub fn grants_manage_guild(roles: impl IntoIterator<Item = serenity::Permissions>) -> bool {
    roles.into_iter().any(|perms| {
        perms.contains(serenity::Permissions::MANAGE_GUILD)
            || perms.contains(serenity::Permissions::ADMINISTRATOR)
    })
}

/// Manage Server check for a message author, from the cached guild
pub fn member_can_manage_guild(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    member_roles: &[serenity::RoleId],
) -> bool {
    let Some(guild) = guild_id.to_guild_cached(cache) else {
        return false;
    };

    if guild.owner_id == user_id {
        return true;
    }

    let everyone = serenity::RoleId::new(guild_id.get());
    let roles = member_roles
        .iter()
        .chain(std::iter::once(&everyone))
        .filter_map(|role_id| guild.roles.get(role_id))
        .map(|role| role.permissions);

    grants_manage_guild(roles)
}

/// Page through the full member list and count humans and bots.
///
/// Requires the Server Members intent. Gives up after `limit`.
pub async fn fetch_member_split(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    limit: Duration,
) -> Result<MemberSplit, BotError> {
    let fetch = async {
        let mut split = MemberSplit::default();
        let mut after: Option<serenity::UserId> = None;

        loop {
            let page = guild_id.members(http, Some(MEMBER_PAGE_SIZE), after).await?;
            let page_len = page.len() as u64;

            let page_split = MemberSplit::count(page.iter().map(|member| member.user.bot));
            split.humans += page_split.humans;
            split.bots += page_split.bots;

            after = page.last().map(|member| member.user.id);
            if page_len < MEMBER_PAGE_SIZE || after.is_none() {
                return Ok::<_, serenity::Error>(split);
            }
        }
    };

    match tokio::time::timeout(limit, fetch).await {
        Ok(Ok(split)) => {
            debug!("Fetched {} members for guild {}", split.humans + split.bots, guild_id);
            Ok(split)
        }
        Ok(Err(e)) => Err(BotError::UpstreamFetchFailed(e.to_string())),
        Err(_) => Err(BotError::UpstreamFetchFailed(format!(
            "member list fetch exceeded {:?}",
            limit
        ))),
    }
}

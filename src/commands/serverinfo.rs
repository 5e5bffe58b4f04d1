use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::discord::slash;
use crate::dispatch::registry::HandlerFuture;
use crate::dispatch::{CommandDefinition, Invocation, Reply, Requester, Surface};
use crate::features::member_counts::MemberSplit;
use crate::models::server::GuildSummary;
use crate::utils::config::colors;
use crate::utils::formatters::{format_number, yes_no};
use crate::{Context, Data, Error};

const UNAVAILABLE: &str = "Unable to fetch";

pub fn definition() -> CommandDefinition {
    CommandDefinition::new("serverinfo", run)
}

fn run<'a>(data: &'a Data, surface: &'a dyn Surface, _invocation: &'a Invocation) -> HandlerFuture<'a> {
    Box::pin(execute(data, surface, Utc::now()))
}

async fn execute(data: &Data, surface: &dyn Surface, now: DateTime<Utc>) -> anyhow::Result<()> {
    if surface.guild().is_none() {
        return surface
            .reply(Reply::Private("This command can only be used in a server.".to_string()))
            .await;
    }

    // Member fetch can take a while on big servers
    surface.defer().await?;

    let summary = surface.guild_summary().await?;
    let members = member_split(data, surface, &summary, now).await;

    surface
        .reply(Reply::Embed(render(&summary, members, surface.author())))
        .await
}

/// Fresh cached split, else a live fetch, else whatever was last known
async fn member_split(
    data: &Data,
    surface: &dyn Surface,
    summary: &GuildSummary,
    now: DateTime<Utc>,
) -> Option<MemberSplit> {
    if let Some(split) = data.member_counts.fresh(&summary.id, now) {
        debug!("Using cached member count for {}", summary.name);
        return Some(split);
    }

    debug!("Fetching member count for {}", summary.name);
    match surface.fetch_member_split().await {
        Ok(split) => {
            data.member_counts.store(&summary.id, split, now);
            Some(split)
        }
        Err(e) => {
            warn!("Failed fetching member count for {}: {:?}", summary.name, e);
            data.member_counts.last_known(&summary.id)
        }
    }
}

fn render(summary: &GuildSummary, members: Option<MemberSplit>, requester: &Requester) -> serenity::CreateEmbed {
    let (humans, bots) = match members {
        Some(split) => (format_number(split.humans), format_number(split.bots)),
        None => (UNAVAILABLE.to_string(), UNAVAILABLE.to_string()),
    };

    let channels = &summary.channels;
    let fields = [
        ("📋 Server Name", summary.name.clone()),
        ("🆔 Server ID", summary.id.clone()),
        ("👑 Owner", summary.owner.clone()),
        ("📅 Creation Date", summary.created.clone()),
        ("👥 Total Members", format_number(summary.member_count)),
        ("👤 Humans", humans),
        ("🤖 Bots", bots),
        ("🎲 Roles", summary.role_count.to_string()),
        ("📺 Total Channels", channels.total.to_string()),
        ("💬 Text Channels", channels.text.to_string()),
        ("🔊 Voice Channels", channels.voice.to_string()),
        ("📰 News Channels", channels.news.to_string()),
        ("🔐 Text Locked Channels", channels.locked_text.to_string()),
        ("🔐 Voice Locked Channels", channels.locked_voice.to_string()),
        ("🚀 Boost Level", summary.boost_level.to_string()),
        ("🔥 Boost Count", summary.boost_count.to_string()),
        ("🔒 Verification Level", summary.verification_level.clone()),
        ("🎨 Invite Splash", yes_no(summary.has_invite_splash).to_string()),
        ("✨ Animated Icon", yes_no(summary.has_animated_icon).to_string()),
        ("🖼️ Server Banner", yes_no(summary.banner_url.is_some()).to_string()),
    ];

    let mut footer = serenity::CreateEmbedFooter::new(format!("Requested by {}", requester.name));
    if let Some(avatar) = &requester.avatar_url {
        footer = footer.icon_url(avatar);
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{}'s Server Information", summary.name))
        .color(colors::SERVER_INFO)
        .fields(fields.into_iter().map(|(name, value)| (name, value, true)))
        .footer(footer)
        .timestamp(serenity::Timestamp::now());

    if let Some(icon) = &summary.icon_url {
        embed = embed.thumbnail(icon);
    }
    if let Some(banner) = &summary.banner_url {
        embed = embed.image(banner);
    }

    embed
}

/// Fetches and posts the server information
#[poise::command(slash_command, guild_only)]
pub async fn serverinfo(ctx: Context<'_>) -> Result<(), Error> {
    slash::dispatch(ctx, "serverinfo", Invocation::structured(None, vec![])).await
}
